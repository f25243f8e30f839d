//! Shared helpers for integration tests.

pub mod portal;
pub mod socket_guard;
