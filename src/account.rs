//! Account data returned by the protected endpoints.

use serde::{Deserialize, Serialize};

use crate::auth::SessionError;

/// One user as returned by `/api/users` and the signed `/api/settings` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Opaque user identifier.
    pub id: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
}

/// Decodes a single user, mapping bad JSON or an empty id to
/// [`SessionError::UpstreamData`].
pub(crate) fn decode_user(endpoint: &str, body: &str) -> Result<UserRecord, SessionError> {
    let user = serde_json::from_str::<UserRecord>(body)
        .map_err(|error| SessionError::upstream(endpoint, error.to_string()))?;
    if user.id.trim().is_empty() {
        return Err(SessionError::upstream(endpoint, "user id is empty"));
    }
    Ok(user)
}

/// Decodes a JSON array of users.
pub(crate) fn decode_users(endpoint: &str, body: &str) -> Result<Vec<UserRecord>, SessionError> {
    serde_json::from_str::<Vec<UserRecord>>(body)
        .map_err(|error| SessionError::upstream(endpoint, error.to_string()))
}
