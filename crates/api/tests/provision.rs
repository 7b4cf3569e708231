mod support;

use std::time::Duration;

use axum::http::Method;
use cfacade_api::{PollPolicy, ProvisionRequest};
use cfacade_types::{AtomicServiceId, FailureKind};
use support::{MockFacade, ticket};
use tokio_util::sync::CancellationToken;

const CONFIGURATIONS: &str = "/atomic_services/taverna/configurations";
const ATTACH: &str = "/workflows/wf-7/atomic_services";
const REDIRECTIONS: &str = "/workflows/wf-7/atomic_services/cfg-1/redirections";

fn request() -> ProvisionRequest {
    ProvisionRequest::new(PollPolicy::new(5).with_backoff(Duration::from_millis(1), Duration::from_millis(5)))
}

#[tokio::test]
async fn provisions_service_and_probes_endpoint() {
    let facade = MockFacade::start().await;
    let endpoint = format!("{}/taverna", facade.base_url());
    facade
        .respond(Method::POST, "/workflows", 200, "wf-7")
        .respond(Method::GET, CONFIGURATIONS, 200, r#"[{"id":"cfg-1"}]"#)
        .respond(Method::POST, ATTACH, 200, "")
        .respond(Method::GET, REDIRECTIONS, 200, r#"{"http":[{"urls":["http://null/taverna"]}]}"#)
        .respond(Method::GET, REDIRECTIONS, 200, &format!(r#"{{"http":[{{"urls":["{endpoint}"]}}]}}"#))
        .respond(Method::GET, "/taverna", 200, "ok");

    let provisioned = facade
        .client()
        .provision_service(
            &AtomicServiceId::new("taverna"),
            &ticket(),
            &request().with_probe("taverna", "taverna"),
            &facade.probe(),
            &CancellationToken::new(),
        )
        .await
        .expect("service provisioned");

    assert_eq!(provisioned.workflow_id.as_str(), "wf-7");
    assert_eq!(provisioned.config_id.as_str(), "cfg-1");
    assert_eq!(provisioned.endpoint.as_str(), endpoint);
    assert_eq!(provisioned.ready, Some(true));

    let order: Vec<String> = facade
        .requests()
        .iter()
        .map(|request| format!("{} {}", request.method, request.path))
        .collect();
    assert_eq!(
        order,
        vec![
            "POST /workflows".to_string(),
            format!("GET {CONFIGURATIONS}"),
            format!("POST {ATTACH}"),
            format!("GET {REDIRECTIONS}"),
            format!("GET {REDIRECTIONS}"),
            "GET /taverna".to_string(),
        ]
    );
}

#[tokio::test]
async fn readiness_is_unset_without_probe_credentials() {
    let facade = MockFacade::start().await;
    facade
        .respond(Method::POST, "/workflows", 200, "wf-7")
        .respond(Method::GET, CONFIGURATIONS, 200, r#"[{"id":"cfg-1"}]"#)
        .respond(Method::POST, ATTACH, 200, "")
        .respond(Method::GET, REDIRECTIONS, 200, r#"{"http":[{"urls":["http://real/x"]}]}"#);

    let provisioned = facade
        .client()
        .provision_service(
            &AtomicServiceId::new("taverna"),
            &ticket(),
            &request(),
            &facade.probe(),
            &CancellationToken::new(),
        )
        .await
        .expect("service provisioned");

    assert_eq!(provisioned.ready, None);
}

#[tokio::test]
async fn failed_attach_rolls_back_workflow() {
    let facade = MockFacade::start().await;
    facade
        .respond(Method::POST, "/workflows", 200, "wf-7")
        .respond(Method::GET, CONFIGURATIONS, 200, r#"[{"id":"cfg-1"}]"#)
        .respond(Method::POST, ATTACH, 503, "")
        .respond(Method::DELETE, "/workflows/wf-7", 204, "");

    let failure = facade
        .client()
        .provision_service(
            &AtomicServiceId::new("taverna"),
            &ticket(),
            &request(),
            &facade.probe(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.description(), "Error attaching service in workflow wf-7");
    assert_eq!(failure.status(), Some(503));
    assert_eq!(facade.hits(Method::DELETE, "/workflows/wf-7"), 1);
    assert_eq!(facade.hits(Method::GET, REDIRECTIONS), 0);
}

#[tokio::test]
async fn failed_creation_skips_rollback() {
    let facade = MockFacade::start().await;
    facade.respond(Method::POST, "/workflows", 401, "");

    let failure = facade
        .client()
        .provision_service(
            &AtomicServiceId::new("taverna"),
            &ticket(),
            &request(),
            &facade.probe(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.status(), Some(401));
    assert_eq!(facade.requests().len(), 1);
}

#[tokio::test]
async fn poll_timeout_still_rolls_back() {
    let facade = MockFacade::start().await;
    facade
        .respond(Method::POST, "/workflows", 200, "wf-7")
        .respond(Method::GET, CONFIGURATIONS, 200, r#"[{"id":"cfg-1"}]"#)
        .respond(Method::POST, ATTACH, 200, "")
        .respond(Method::GET, REDIRECTIONS, 200, r#"{"http":[{"urls":["http://null/x"]}]}"#)
        .respond(Method::DELETE, "/workflows/wf-7", 200, "");

    let failure = facade
        .client()
        .provision_service(
            &AtomicServiceId::new("taverna"),
            &ticket(),
            &request(),
            &facade.probe(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(failure.kind(), FailureKind::Timeout { attempts: 5, .. }), "{failure:?}");
    assert_eq!(facade.hits(Method::GET, REDIRECTIONS), 5);
    assert_eq!(facade.hits(Method::DELETE, "/workflows/wf-7"), 1);
}
