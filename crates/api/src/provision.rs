//! End-to-end provisioning of an atomic service inside a fresh workflow.
//!
//! Runs create, resolve, attach, poll and probe in order. When a step after
//! creation fails, the new workflow is deleted before the failure is returned
//! so the backend is not left holding an orphan.

use cfacade_types::{AtomicServiceConfigId, AtomicServiceId, OperationResult, ResolvedEndpoint, Ticket, WorkflowId};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{FacadeClient, PollPolicy, ReadinessProbe, loggable_url};

/// Basic credentials for probing the provisioned endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ProbeCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProbeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Inputs for [`FacadeClient::provision_service`].
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub poll_policy: PollPolicy,
    /// When absent the endpoint is not probed and `ready` is `None`.
    pub probe: Option<ProbeCredentials>,
}

impl ProvisionRequest {
    /// Poll with `poll_policy` and skip the readiness probe.
    pub fn new(poll_policy: PollPolicy) -> Self {
        Self { poll_policy, probe: None }
    }

    /// Probe the resolved endpoint with these basic credentials.
    pub fn with_probe(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.probe = Some(ProbeCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

/// A service attached to its own workflow with a routable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedService {
    pub workflow_id: WorkflowId,
    pub config_id: AtomicServiceConfigId,
    pub endpoint: ResolvedEndpoint,
    pub ready: Option<bool>,
}

impl FacadeClient {
    /// Provision `atomic_service_id` in a new workflow and resolve its endpoint.
    ///
    /// A `false` readiness result is still a success; the caller decides
    /// whether to wait longer or tear the workflow down.
    pub async fn provision_service(
        &self,
        atomic_service_id: &AtomicServiceId,
        ticket: &Ticket,
        request: &ProvisionRequest,
        probe: &ReadinessProbe,
        cancel: &CancellationToken,
    ) -> OperationResult<ProvisionedService> {
        let workflow_id = self.create_workflow(ticket).await?;

        let attached = self
            .attach_and_resolve(atomic_service_id, &workflow_id, ticket, &request.poll_policy, cancel)
            .await;
        let (config_id, endpoint) = match attached {
            Ok(resolved) => resolved,
            Err(failure) => {
                self.rollback(&workflow_id, ticket).await;
                return Err(failure);
            }
        };

        let ready = match &request.probe {
            Some(credentials) => Some(probe.check(endpoint.as_str(), &credentials.username, &credentials.password).await),
            None => None,
        };

        info!(workflow_id = %workflow_id, endpoint = %loggable_url(endpoint.as_str()), ?ready, "service provisioned");
        Ok(ProvisionedService {
            workflow_id,
            config_id,
            endpoint,
            ready,
        })
    }

    async fn attach_and_resolve(
        &self,
        atomic_service_id: &AtomicServiceId,
        workflow_id: &WorkflowId,
        ticket: &Ticket,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> OperationResult<(AtomicServiceConfigId, ResolvedEndpoint)> {
        let config_id = self.resolve_config_id(atomic_service_id, ticket).await?;
        self.attach_service(&config_id, workflow_id, ticket).await?;
        let endpoint = self.poll_endpoint(&config_id, workflow_id, ticket, policy, cancel).await?;
        Ok((config_id, endpoint))
    }

    async fn rollback(&self, workflow_id: &WorkflowId, ticket: &Ticket) {
        match self.delete_workflow(workflow_id, ticket).await {
            Ok(_) => info!(workflow_id = %workflow_id, "rolled back partially provisioned workflow"),
            Err(failure) => warn!(workflow_id = %workflow_id, error = %failure, "rollback of workflow failed"),
        }
    }
}
