mod support;

use axum::http::Method;
use cfacade_api::{FacadeConfig, ReadinessProbe};
use support::{MockFacade, unreachable_base_url};

#[tokio::test]
async fn probe_is_ready_only_on_200() {
    let facade = MockFacade::start().await;
    facade.respond(Method::GET, "/ready", 200, "ok");
    let url = format!("{}/ready", facade.base_url());

    assert!(facade.probe().check(&url, "taverna", "secret").await);

    let requests = facade.requests();
    // base64("taverna:secret")
    assert_eq!(requests[0].authorization.as_deref(), Some("Basic dGF2ZXJuYTpzZWNyZXQ="));
}

#[tokio::test]
async fn probe_rejects_every_other_status() {
    for status in [201u16, 204, 301, 401, 404, 500, 503] {
        let facade = MockFacade::start().await;
        facade.respond(Method::GET, "/ready", status, "");
        let url = format!("{}/ready", facade.base_url());

        assert!(!facade.probe().check(&url, "u", "p").await, "status {status} should not be ready");
    }
}

#[tokio::test]
async fn probe_treats_connection_failure_as_not_ready() {
    let probe = ReadinessProbe::new(&FacadeConfig::new(unreachable_base_url())).expect("probe");
    let url = format!("{}/ready", unreachable_base_url());

    assert!(!probe.check(&url, "u", "p").await);
}

#[tokio::test]
async fn probe_skips_empty_and_invalid_urls() {
    let facade = MockFacade::start().await;
    let probe = facade.probe();

    assert!(!probe.check("", "u", "p").await);
    assert!(!probe.check("not a url", "u", "p").await);
    assert!(facade.requests().is_empty());
}
