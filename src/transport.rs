//! HTTP transport for the session flow.
//!
//! A thin wrapper over `reqwest::Client` that centralizes networking policy
//! (timeouts, user-agent, proxy compatibility, cookie provider) and reduces
//! every response to status, `Location` and body text.
//!
//! Redirects are never followed: the login step must see the raw 302.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, redirect};
use tracing::{debug, warn};
use url::Url;

use crate::auth::SessionJar;
use crate::config::ClientConfig;
use crate::user_agent;

/// Content type of form submissions and signed payloads.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Errors produced by the transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The underlying client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    Build {
        /// Why construction failed.
        reason: String,
    },
}

impl TransportError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, when present.
    pub location: Option<String>,
    /// Response body decoded as text.
    pub body: String,
}

impl TransportResponse {
    /// Returns `true` for a 200 status.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// HTTP client bound to one session's cookie jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport whose requests read and write `jar`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when client construction fails.
    pub fn new(config: &ClientConfig, jar: Arc<SessionJar>) -> Result<Self, TransportError> {
        let settings = BuildSettings {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            user_agent: user_agent::default_user_agent(),
        };

        match try_build_client(&settings, &jar, false) {
            Ok(client) => Ok(Self { client }),
            Err(BuildClientFailure::Panic) => {
                // Some sandboxed environments panic when querying system proxy
                // settings; retry with env-only proxy lookup.
                warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
                match try_build_client(&settings, &jar, true) {
                    Ok(client) => Ok(Self { client }),
                    Err(BuildClientFailure::Panic) => Err(TransportError::Build {
                        reason: "client construction panicked".to_string(),
                    }),
                    Err(BuildClientFailure::Build(error)) => Err(TransportError::Build {
                        reason: error.to_string(),
                    }),
                }
            }
            Err(BuildClientFailure::Build(error)) => Err(TransportError::Build {
                reason: error.to_string(),
            }),
        }
    }

    /// Issues a GET.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on an invalid URL or a transport failure.
    pub async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let target = parse_url(url)?;
        self.send(url, self.client.get(target)).await
    }

    /// POSTs `fields` as an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on an invalid URL or a transport failure.
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<TransportResponse, TransportError> {
        let target = parse_url(url)?;
        self.send(url, self.client.post(target).form(fields)).await
    }

    /// POSTs a pre-encoded form body verbatim.
    ///
    /// Used for signed payloads, whose exact bytes are covered by the signature.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on an invalid URL or a transport failure.
    pub async fn post_encoded(
        &self,
        url: &str,
        body: String,
    ) -> Result<TransportResponse, TransportError> {
        let target = parse_url(url)?;
        let request = self
            .client
            .post(target)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);
        self.send(url, request).await
    }

    /// POSTs with an empty body and an `Accept: application/json` header.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on an invalid URL or a transport failure.
    pub async fn post_empty(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let target = parse_url(url)?;
        let request = self
            .client
            .post(target)
            .header(ACCEPT, "application/json");
        self.send(url, request).await
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<TransportResponse, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(url, error))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::from_reqwest(url, error))?;

        debug!(url, status, bytes = body.len(), "response received");
        Ok(TransportResponse {
            status,
            location,
            body,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, TransportError> {
    Url::parse(url).map_err(|_| TransportError::InvalidUrl {
        url: url.to_string(),
    })
}

struct BuildSettings {
    connect_timeout: Duration,
    read_timeout: Duration,
    user_agent: String,
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    settings: &BuildSettings,
    jar: &Arc<SessionJar>,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(|| {
        let mut builder = base_builder(settings, Arc::clone(jar));
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(settings: &BuildSettings, jar: Arc<SessionJar>) -> ClientBuilder {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.read_timeout)
        .user_agent(settings.user_agent.clone())
        .redirect(redirect::Policy::none())
        .gzip(true)
        .cookie_provider(jar)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    let names: &[&str] = match scheme {
        "https" => &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"],
        "http" => &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"],
        _ => return None,
    };
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
