//! Atomic service configuration lookup and attachment.

use cfacade_types::{AtomicServiceConfigId, AtomicServiceId, FailureKind, OperationFailure, OperationResult, Ticket, WorkflowId};
use cfacade_util::http::parse_response_json_strict;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::workflow::workflow_path;
use crate::{FacadeClient, encode_segment};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachRequest<'a> {
    as_config_id: &'a str,
}

/// Pick the configuration to use from the backend's list.
///
/// The first entry wins. Ids may be strings or numbers on the wire.
fn select_config_id(configurations: &Value) -> Result<AtomicServiceConfigId, FailureKind> {
    let entries = configurations
        .as_array()
        .ok_or_else(|| FailureKind::malformed("configuration list is not a JSON array"))?;
    let first = entries
        .first()
        .ok_or_else(|| FailureKind::malformed("configuration list is empty"))?;
    match first.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(AtomicServiceConfigId::new(id.as_str())),
        Some(Value::Number(id)) => Ok(AtomicServiceConfigId::new(id.to_string())),
        _ => Err(FailureKind::malformed("first configuration has no usable id")),
    }
}

impl FacadeClient {
    /// Resolve the configuration id registered for an atomic service.
    pub async fn resolve_config_id(
        &self,
        atomic_service_id: &AtomicServiceId,
        ticket: &Ticket,
    ) -> OperationResult<AtomicServiceConfigId> {
        let path = format!("/atomic_services/{}/configurations", encode_segment(atomic_service_id.as_str()));
        let failed = |kind: FailureKind| {
            OperationFailure::new(kind, format!("Error getting configuration Id for AS {atomic_service_id}"))
                .with_context(atomic_service_id.as_str())
        };

        let response = self
            .execute(self.request(Method::GET, &path, ticket))
            .await
            .map_err(failed)?;

        if response.status != StatusCode::OK {
            warn!(atomic_service_id = %atomic_service_id, status = response.status.as_u16(), "configuration lookup rejected");
            return Err(failed(FailureKind::remote_rejected(response.status.as_u16(), path)));
        }

        let configurations = parse_response_json_strict(&response.body, Some(response.status))
            .map_err(|error| failed(FailureKind::malformed(error.to_string())))?;
        let config_id = select_config_id(&configurations).map_err(failed)?;
        debug!(atomic_service_id = %atomic_service_id, config_id = %config_id, "configuration resolved");
        Ok(config_id)
    }

    /// Attach a service configuration to a workflow. Success echoes `workflow_id`.
    pub async fn attach_service(
        &self,
        config_id: &AtomicServiceConfigId,
        workflow_id: &WorkflowId,
        ticket: &Ticket,
    ) -> OperationResult<WorkflowId> {
        let path = format!("{}/atomic_services", workflow_path(workflow_id));
        let failed = |kind: FailureKind| {
            OperationFailure::new(kind, format!("Error attaching service in workflow {workflow_id}")).with_context(workflow_id.as_str())
        };
        let body = AttachRequest {
            as_config_id: config_id.as_str(),
        };

        let response = self
            .execute(self.request(Method::POST, &path, ticket).json(&body))
            .await
            .map_err(failed)?;

        if response.status != StatusCode::OK {
            warn!(workflow_id = %workflow_id, status = response.status.as_u16(), "service attachment rejected");
            return Err(failed(FailureKind::remote_rejected(response.status.as_u16(), path)));
        }

        info!(workflow_id = %workflow_id, config_id = %config_id, "service attached");
        Ok(workflow_id.clone())
    }
}
