//! Workflow creation and deletion.

use cfacade_types::{FailureKind, OperationFailure, OperationResult, Ticket, WorkflowId};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{info, warn};

use crate::{FacadeClient, encode_segment};

/// Name of the workflow kind every created workflow uses.
pub const WORKFLOW_NAME: &str = "tavernaserverworkflow";
/// Resource type sent with every created workflow.
pub const WORKFLOW_TYPE: &str = "workflow";

const CREATE_FAILED: &str = "Error creating workflow";

#[derive(Debug, Serialize)]
struct NewWorkflow {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

pub(crate) fn workflow_path(workflow_id: &WorkflowId) -> String {
    format!("/workflows/{}", encode_segment(workflow_id.as_str()))
}

impl FacadeClient {
    /// Create a workflow container and return the id the backend minted.
    ///
    /// Success is exactly HTTP 200; the body text is the new id.
    pub async fn create_workflow(&self, ticket: &Ticket) -> OperationResult<WorkflowId> {
        let path = "/workflows";
        let body = NewWorkflow {
            name: WORKFLOW_NAME,
            kind: WORKFLOW_TYPE,
        };
        let failed = |kind: FailureKind| OperationFailure::new(kind, CREATE_FAILED);

        let response = self
            .execute(self.request(Method::POST, path, ticket).json(&body))
            .await
            .map_err(failed)?;

        if response.status != StatusCode::OK {
            warn!(status = response.status.as_u16(), "workflow creation rejected");
            return Err(failed(FailureKind::remote_rejected(response.status.as_u16(), path)));
        }
        if response.body.is_empty() {
            return Err(failed(FailureKind::malformed("empty workflow id in creation response")));
        }

        let workflow_id = WorkflowId::new(response.body);
        info!(workflow_id = %workflow_id, "workflow created");
        Ok(workflow_id)
    }

    /// Delete a workflow. Success (200 or 204) echoes `workflow_id`.
    pub async fn delete_workflow(&self, workflow_id: &WorkflowId, ticket: &Ticket) -> OperationResult<WorkflowId> {
        let path = workflow_path(workflow_id);
        let failed = |kind: FailureKind| {
            OperationFailure::new(kind, format!("Error deleting workflow {workflow_id}")).with_context(workflow_id.as_str())
        };

        let response = self
            .execute(self.request(Method::DELETE, &path, ticket))
            .await
            .map_err(failed)?;

        match response.status {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                info!(workflow_id = %workflow_id, "workflow deleted");
                Ok(workflow_id.clone())
            }
            status => {
                warn!(workflow_id = %workflow_id, status = status.as_u16(), "workflow deletion rejected");
                Err(failed(FailureKind::remote_rejected(status.as_u16(), path)))
            }
        }
    }
}
