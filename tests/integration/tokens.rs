use std::sync::Arc;
use std::time::Duration;

use restbridge::auth::{basic_header, CacheKey, CallContext, ClientIdentity};
use restbridge::client::{
    AdapterConfig, ErrorKind, FailoverController, RequestMethod, RequestOptions, Response, Result,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{init_tracing, oauth_entity, token_body};

fn controller(server: &MockServer) -> FailoverController {
    let config = AdapterConfig::default()
        .with_entity("books", oauth_entity(server, [server.uri()]));
    FailoverController::new(config).unwrap()
}

async fn get(controller: &FailoverController, ctx: &CallContext) -> Result<Response> {
    controller
        .execute(
            "books",
            RequestMethod::Get,
            "/api/v1/Books",
            None,
            &RequestOptions::new(),
            ctx,
        )
        .await
}

#[tokio::test]
async fn test_fresh_token_is_reused() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=integration-client"))
        .and(body_string_contains("scope=api%3A%2F%2Fbooks%2F.default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(3)
        .mount(&server)
        .await;

    let controller = controller(&server);
    for _ in 0..3 {
        get(&controller, &CallContext::default()).await.unwrap();
    }
}

#[tokio::test]
async fn test_token_inside_expiry_margin_is_refreshed() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short-lived", 20)))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books"))
        .and(header("Authorization", "Bearer short-lived"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(3)
        .mount(&server)
        .await;

    let controller = controller(&server);
    for _ in 0..3 {
        get(&controller, &CallContext::default()).await.unwrap();
    }
}

#[tokio::test]
async fn test_concurrent_callers_share_one_acquisition() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("tok-shared", 3600))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books"))
        .and(header("Authorization", "Bearer tok-shared"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(8)
        .mount(&server)
        .await;

    let controller = Arc::new(controller(&server));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { get(&controller, &CallContext::default()).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_unauthorized_forces_new_client_and_token() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("revoked", 3600)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("renewed", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let key = CacheKey::new("books", ClientIdentity::shared());

    let err = get(&controller, &CallContext::default()).await.unwrap_err();
    assert!(err.is_auth_error());
    assert!(!controller.cache().contains(&key));

    get(&controller, &CallContext::default()).await.unwrap();
    assert!(controller.cache().contains(&key));
}

#[tokio::test]
async fn test_pass_through_callers_get_separate_clients() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("unused", 3600)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let alice = CallContext::with_authorization(basic_header("alice", "a-secret"));
    let bob = CallContext::with_authorization("Bearer bob-token");

    get(&controller, &alice).await.unwrap();
    get(&controller, &bob).await.unwrap();

    let alice_key = CacheKey::for_call("books", &alice);
    let bob_key = CacheKey::for_call("books", &bob);
    assert_ne!(alice_key, bob_key);
    assert!(controller.cache().contains(&alice_key));
    assert!(controller.cache().contains(&bob_key));
    assert!(!alice_key.identity.as_str().contains("a-secret"));

    let requests = server.received_requests().await.unwrap();
    let authorizations: Vec<_> = requests
        .iter()
        .filter_map(|r| r.headers.get("Authorization"))
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        authorizations,
        vec![basic_header("alice", "a-secret"), "Bearer bob-token".to_string()]
    );
}

#[tokio::test]
async fn test_token_endpoint_error_is_not_retried() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "Client authentication failed",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let err = get(&controller, &CallContext::default()).await.unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Token(_)));
    assert!(err.to_string().contains("invalid_client"));
    assert!(!controller
        .cache()
        .contains(&CacheKey::new("books", ClientIdentity::shared())));
}
