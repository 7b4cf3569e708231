//! Endpoint discovery for attached services.
//!
//! After a service is attached, the facade reports a placeholder redirection
//! URL (one containing `"null"`) until the instance is routable. This module
//! owns the polling loop that waits for a real URL, bounded by a caller-set
//! [`PollPolicy`] and abortable through a [`CancellationToken`].

use std::time::{Duration, Instant};

use cfacade_types::{AtomicServiceConfigId, FailureKind, OperationFailure, OperationResult, ResolvedEndpoint, Ticket, WorkflowId};
use cfacade_util::http::parse_response_json_strict;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::workflow::workflow_path;
use crate::{FacadeClient, encode_segment, loggable_url};

const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
const DEFAULT_MULTIPLIER: u32 = 2;

/// Bounds and pacing for [`FacadeClient::poll_endpoint`].
///
/// The attempt cap is mandatory. Backoff starts at `initial_backoff`, is
/// multiplied by `multiplier` after each placeholder response and never
/// exceeds `max_backoff`. An optional `deadline` caps total wall time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: u32,
    deadline: Option<Duration>,
}

impl PollPolicy {
    /// Poll at most `max_attempts` times (at least once).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_MULTIPLIER,
            deadline: None,
        }
    }

    /// Start waiting `initial` after the first placeholder and grow up to `max`.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Growth factor between attempts; 1 keeps a fixed interval.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    /// Give up with `Timeout` once `deadline` has elapsed since the first
    /// attempt, even if attempts remain. A sleep that would cross the
    /// deadline is not started.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attempt cap after clamping.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given (1-based) attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Deserialize)]
struct Redirections {
    #[serde(default)]
    http: Vec<Redirection>,
}

#[derive(Debug, Deserialize)]
struct Redirection {
    #[serde(default)]
    urls: Vec<String>,
}

/// Read `http[0].urls[0]` from a redirections document.
fn first_http_url(body: &str, status: StatusCode) -> Result<ResolvedEndpoint, FailureKind> {
    let value = parse_response_json_strict(body, Some(status)).map_err(|error| FailureKind::malformed(error.to_string()))?;
    let redirections: Redirections =
        serde_json::from_value(value).map_err(|error| FailureKind::malformed(format!("unexpected redirections shape: {error}")))?;
    redirections
        .http
        .into_iter()
        .next()
        .ok_or_else(|| FailureKind::malformed("no http redirections published"))?
        .urls
        .into_iter()
        .next()
        .map(ResolvedEndpoint::new)
        .ok_or_else(|| FailureKind::malformed("http redirection has no urls"))
}

impl FacadeClient {
    /// Poll the workflow's redirections until the service publishes a real
    /// HTTP endpoint.
    ///
    /// Placeholder responses are retried per `policy`. A rejected status, a
    /// transport fault, or an unreadable body ends the poll immediately.
    /// Exhausting the attempts or the deadline yields `Timeout`; firing
    /// `cancel` yields `Cancelled`.
    pub async fn poll_endpoint(
        &self,
        config_id: &AtomicServiceConfigId,
        workflow_id: &WorkflowId,
        ticket: &Ticket,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> OperationResult<ResolvedEndpoint> {
        let path = format!(
            "{}/atomic_services/{}/redirections",
            workflow_path(workflow_id),
            encode_segment(config_id.as_str())
        );
        let failed = |kind: FailureKind| {
            OperationFailure::new(kind, format!("Error getting service endpoint in workflow {workflow_id}"))
                .with_context(workflow_id.as_str())
        };

        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                warn!(workflow_id = %workflow_id, attempts, "endpoint poll cancelled");
                return Err(failed(FailureKind::Cancelled { attempts }));
            }

            attempts += 1;
            let request = self.execute(self.request(Method::GET, &path, ticket));
            let response = tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(workflow_id = %workflow_id, attempts, "endpoint poll cancelled");
                    return Err(failed(FailureKind::Cancelled { attempts }));
                }
                response = request => response.map_err(failed)?,
            };

            if response.status != StatusCode::OK {
                warn!(workflow_id = %workflow_id, status = response.status.as_u16(), attempts, "redirections lookup rejected");
                return Err(failed(FailureKind::remote_rejected(response.status.as_u16(), path)));
            }

            let endpoint = first_http_url(&response.body, response.status).map_err(failed)?;
            if !endpoint.is_placeholder() {
                info!(workflow_id = %workflow_id, attempts, endpoint = %loggable_url(endpoint.as_str()), "service endpoint resolved");
                return Ok(endpoint);
            }

            let elapsed = started.elapsed();
            if attempts >= policy.max_attempts {
                warn!(workflow_id = %workflow_id, attempts, "endpoint poll exhausted its attempts");
                return Err(failed(timeout(attempts, elapsed)));
            }

            let delay = policy.delay_after(attempts);
            if let Some(deadline) = policy.deadline
                && elapsed + delay > deadline
            {
                warn!(workflow_id = %workflow_id, attempts, "endpoint poll deadline reached");
                return Err(failed(timeout(attempts, elapsed)));
            }

            debug!(workflow_id = %workflow_id, attempts, delay_ms = delay.as_millis() as u64, "endpoint still provisioning");
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(workflow_id = %workflow_id, attempts, "endpoint poll cancelled");
                    return Err(failed(FailureKind::Cancelled { attempts }));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn timeout(attempts: u32, elapsed: Duration) -> FailureKind {
    FailureKind::Timeout {
        attempts,
        elapsed_ms: elapsed.as_millis() as u64,
    }
}
