use std::time::Duration;

use restbridge::auth::{AuthConfig, OAuthSettings};
use restbridge::client::{ClientConfig, EntityConfig, RetryConfig};
use wiremock::MockServer;

/// Install the test subscriber once per process.
pub fn init_tracing() {
    restbridge::init_tracing();
}

/// A base URL nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Client configuration with millisecond rate-limit waits.
pub fn fast_config() -> ClientConfig {
    ClientConfig::builder()
        .with_retry(
            RetryConfig::default()
                .with_rate_limit_wait(Duration::from_millis(20))
                .with_retry_after_fallback(Duration::from_millis(20)),
        )
        .build()
}

/// Entity authenticating with client credentials against `server`'s `/token`.
pub fn oauth_entity<I, S>(server: &MockServer, base_urls: I) -> EntityConfig
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    EntityConfig::new(base_urls).with_auth(AuthConfig {
        oauth: Some(
            OAuthSettings::new("integration-client")
                .with_secret("integration-secret")
                .with_token_url(format!("{}/token", server.uri()))
                .with_scope("api://books/.default"),
        ),
        ..Default::default()
    })
}

/// A successful token endpoint body.
pub fn token_body(token: &str, expires_in: u64) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}
