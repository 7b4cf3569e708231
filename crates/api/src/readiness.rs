//! One-shot reachability check against a resolved endpoint.

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::{ConfigError, FacadeConfig};
use crate::{build_http_client, loggable_url, transport_failure};

/// Probes an arbitrary URL with its own basic credentials.
///
/// Unlike [`FacadeClient`](crate::FacadeClient) the probe is not tied to the
/// facade base URL; it only borrows the TLS and timeout settings.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    http: Client,
}

impl ReadinessProbe {
    /// Build a probe that shares the facade's TLS and timeout settings.
    pub fn new(config: &FacadeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: build_http_client(config)?,
        })
    }

    /// Issue a single GET against `url`.
    ///
    /// Returns `true` only for HTTP 200. Any other status, a transport fault,
    /// or an empty URL yields `false`.
    pub async fn check(&self, url: &str, username: &str, password: &str) -> bool {
        if url.trim().is_empty() {
            return false;
        }

        let logged_url = loggable_url(url);
        match self.http.get(url).basic_auth(username, Some(password)).send().await {
            Ok(response) => {
                let ready = response.status() == StatusCode::OK;
                debug!(url = %logged_url, status = response.status().as_u16(), ready, "readiness probe");
                ready
            }
            Err(error) => {
                debug!(url = %logged_url, error = %transport_failure(&error), "readiness probe failed");
                false
            }
        }
    }
}
