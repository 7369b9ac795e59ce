use restbridge::auth::CallContext;
use restbridge::client::AdapterConfig;
use restbridge::RestAdapter;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{closed_port_url, init_tracing, token_body};

fn config_json(server: &MockServer, base_urls: &[String]) -> String {
    json!({
        "entities": {
            "books": {
                "baseUrls": base_urls,
                "oauth": {
                    "clientId": "books-client",
                    "clientSecret": "books-secret",
                    "tokenUrl": format!("{}/token", server.uri()),
                },
                "options": {
                    "headers": { "X-Adapter": "restbridge" }
                }
            }
        }
    })
    .to_string()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("books-token", 3600)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_round_trip() {
    init_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/Books"))
        .and(header("Authorization", "Bearer books-token"))
        .and(header("X-Adapter", "restbridge"))
        .and(body_json(json!({"ID": 1, "Title": "E", "Description": "S", "Excerpt": "U"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(
                json!({"ID": 101, "Title": "E", "Description": "S", "Excerpt": "U"}),
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = AdapterConfig::from_json_str(&config_json(&server, &[server.uri()])).unwrap();
    let adapter = RestAdapter::new(config).unwrap();

    let created = adapter
        .create(
            "books",
            &json!({"eventName": "E", "subjectName": "S", "userID": "U"}),
        )
        .await
        .unwrap();
    assert_eq!(
        created,
        json!({"ID": 101, "Title": "E", "Description": "S", "Excerpt": "U"})
    );
}

#[tokio::test]
async fn test_crud_flow_with_failover() {
    init_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books"))
        .and(query_param("top", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"ID": 7}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/Books/7"))
        .and(body_json(json!({"ID": 7, "Title": "Renamed"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ID": 7, "Title": "Renamed"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/Books/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let base_urls = [closed_port_url(), server.uri()];
    let config = AdapterConfig::from_json_str(&config_json(&server, &base_urls)).unwrap();
    let adapter = RestAdapter::new(config).unwrap();

    let listed = adapter
        .read("books", None, &[("top", "1")], None)
        .await
        .unwrap();
    assert_eq!(listed, json!([{"ID": 7}]));

    let patched = adapter
        .partial_update("books", "7", &json!({"eventName": "Renamed"}))
        .await
        .unwrap();
    assert_eq!(patched["Title"], "Renamed");

    adapter.delete("books", "7").await.unwrap();
}

#[tokio::test]
async fn test_malformed_json_is_returned_raw() {
    init_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let config = AdapterConfig::from_json_str(&config_json(&server, &[server.uri()])).unwrap();
    let adapter = RestAdapter::new(config).unwrap();

    let body = adapter.read("books", Some("3"), &[], None).await.unwrap();
    assert_eq!(body, json!("<html>not json</html>"));
}

#[tokio::test]
async fn test_not_found_and_validation_errors() {
    init_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/Books/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"title": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = AdapterConfig::from_json_str(&config_json(&server, &[server.uri()])).unwrap();
    let adapter = RestAdapter::new(config).unwrap();

    let err = adapter
        .read("books", Some("404"), &[], None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.client_error().and_then(|e| e.body()),
        Some(&json!({"title": "Not Found"}))
    );

    let err = adapter
        .create("books", &json!({"eventName": "E"}))
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn test_pass_through_call_skips_token_endpoint() {
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
        .and(header("Authorization", "Bearer caller-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = AdapterConfig::from_json_str(&config_json(&server, &[server.uri()])).unwrap();
    let adapter = RestAdapter::new(config).unwrap();
    let ctx = CallContext::with_authorization("Bearer caller-token");

    let listed = adapter
        .call(&ctx)
        .read("books", None, &[], None)
        .await
        .unwrap();
    assert_eq!(listed, json!([]));
}
