use std::time::{Duration, Instant};

use restbridge::auth::{CacheKey, CallContext, ClientIdentity};
use restbridge::client::{
    AdapterConfig, EntityConfig, FailoverController, RequestMethod, RequestOptions, Response,
    Result,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{closed_port_url, fast_config, init_tracing};

fn shared_key() -> CacheKey {
    CacheKey::new("books", ClientIdentity::shared())
}

async fn get(controller: &FailoverController, path: &str) -> Result<Response> {
    controller
        .execute(
            "books",
            RequestMethod::Get,
            path,
            None,
            &RequestOptions::new(),
            &CallContext::default(),
        )
        .await
}

#[tokio::test]
async fn test_connection_failures_try_every_base_url_once() {
    init_tracing();

    for n in 1..=4 {
        let urls: Vec<String> = (0..n).map(|_| closed_port_url()).collect();
        let config = AdapterConfig::default().with_entity("books", EntityConfig::new(urls.clone()));
        let controller = FailoverController::new(config).unwrap();

        let err = get(&controller, "/api/v1/Books").await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused", "{n} base URLs");

        // The last attempt ran against the last base URL and no further.
        assert_eq!(
            controller.cache().base_url(&shared_key()),
            Some(urls[n - 1].clone())
        );
    }
}

#[tokio::test]
async fn test_failover_reaches_healthy_base_url() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"ID": 1}])))
        .expect(2)
        .mount(&server)
        .await;

    let config = AdapterConfig::default().with_entity(
        "books",
        EntityConfig::new([closed_port_url(), closed_port_url(), server.uri()]),
    );
    let controller = FailoverController::new(config).unwrap();

    let response = get(&controller, "/api/v1/Books").await.unwrap();
    assert_eq!(response.body, serde_json::json!([{"ID": 1}]));

    // Later calls stay on the healthy URL.
    get(&controller, "/api/v1/Books").await.unwrap();
    assert_eq!(
        controller.cache().base_url(&shared_key()),
        Some(server.uri())
    );
}

#[tokio::test]
async fn test_rate_limit_fails_over_to_next_base_url() {
    init_tracing();
    let limited = MockServer::start().await;
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&limited)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .expect(1)
        .mount(&healthy)
        .await;

    let config = AdapterConfig::default()
        .with_entity("books", EntityConfig::new([limited.uri(), healthy.uri()]));
    let controller = FailoverController::with_config(config, fast_config()).unwrap();

    let response = get(&controller, "/x").await.unwrap();
    assert_eq!(response.body, serde_json::json!("done"));
}

#[tokio::test]
async fn test_retry_after_waits_hint_plus_one_second() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = AdapterConfig::default().with_entity("books", EntityConfig::new([server.uri()]));
    let controller = FailoverController::new(config).unwrap();

    let started = Instant::now();
    let response = get(&controller, "/x").await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.body, serde_json::json!({"ok": true}));
    assert!(elapsed >= Duration::from_secs(6), "waited {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(10), "waited {:?}", elapsed);
    assert_eq!(
        controller.cache().base_url(&shared_key()),
        Some(server.uri())
    );
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    init_tracing();
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "boom"})),
        )
        .expect(1)
        .mount(&first)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&second)
        .await;

    let config = AdapterConfig::default()
        .with_entity("books", EntityConfig::new([first.uri(), second.uri()]));
    let controller = FailoverController::new(config).unwrap();

    let err = get(&controller, "/x").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.body(), Some(&serde_json::json!({"error": "boom"})));
}
