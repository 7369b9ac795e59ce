//! Single HTTP call execution.

use tracing::{debug, info};

use crate::config::{ClientConfig, ProxyConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::request::ResolvedRequest;
use crate::response::{parse_body, Response};

/// Performs exactly one HTTP call for a resolved request.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    default_http: reqwest::Client,
    config: ClientConfig,
}

impl RequestExecutor {
    /// Create an executor with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let default_http = build_http_client(&config, None)?;
        Ok(Self {
            default_http,
            config,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// HTTP client for the given proxy settings.
    ///
    /// Requests without a proxy share one connection pool.
    pub fn http_client(&self, proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
        match proxy {
            None => Ok(self.default_http.clone()),
            Some(proxy) => build_http_client(&self.config, Some(proxy)),
        }
    }

    /// Execute a single request without retry logic.
    ///
    /// Any status outside 200-299 is an error; a 429 carries the retry hint.
    pub async fn do_request_once(
        &self,
        request: &ResolvedRequest,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut req = request
            .http
            .request(request.method.to_reqwest(), request.url.clone());

        for (name, value) in request.headers.iter() {
            req = req.header(name, value);
        }

        if let Some(body) = body {
            let bytes = request.encode_body(body)?;
            req = req
                .header(reqwest::header::CONTENT_LENGTH, bytes.len())
                .body(bytes);
        }

        if self.config.enable_tracing {
            debug!(method = %request.method, url = %request.url, "Sending request");
        }

        let response = req.send().await?;
        let status = response.status();

        if self.config.enable_tracing {
            if status.is_success() {
                debug!(status = status.as_u16(), "Response received");
            } else {
                info!(status = status.as_u16(), "Non-success response");
            }
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let header = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok());
            let retry_after = self.config.retry.retry_after_hint(header);
            return Err(Error::new(ErrorKind::RateLimited {
                retry_after: Some(retry_after),
            }));
        }

        let status_message = status.canonical_reason().unwrap_or_default().to_string();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::new(ErrorKind::Http {
                status: status.as_u16(),
                message: status_message,
                body: parse_body(text),
            }));
        }

        Ok(Response::from_text(status.as_u16(), status_message, text))
    }
}

/// Build a reqwest client, acting as the proxy agent when a proxy is given.
pub(crate) fn build_http_client(
    config: &ClientConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.timeout)
        .user_agent(&config.user_agent)
        .gzip(true)
        .deflate(true);

    if let Some(proxy) = proxy {
        let mut agent = reqwest::Proxy::all(proxy.host.as_str()).map_err(|e| {
            Error::with_source(
                ErrorKind::Configuration(format!("invalid proxy host '{}'", proxy.host)),
                e,
            )
        })?;
        if let Some((user, pass)) = proxy.credentials() {
            agent = agent.basic_auth(user, pass);
        }
        builder = builder.proxy(agent);
    }

    builder
        .build()
        .map_err(|e| Error::with_source(ErrorKind::Configuration(e.to_string()), e))
}
