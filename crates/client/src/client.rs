//! Retry and failover loop around a single HTTP call.

use restbridge_auth::{CacheKey, CallContext, CredentialStore};
use tracing::{debug, error, instrument, warn};

use crate::config::{AdapterConfig, ClientConfig};
use crate::error::Result;
use crate::request::{RequestMethod, RequestOptions};
use crate::response::Response;
use crate::retry::{FailoverPolicy, RetryDecision};
use crate::service_client::{is_absolute_url, ServiceClientCache};

/// Outbound request engine for all configured entities.
///
/// Every call goes through [`FailoverController::execute`], which resolves a
/// service client, performs the call, and decides between rate-limit backoff,
/// base-URL failover, eviction and surfacing the error.
#[derive(Debug)]
pub struct FailoverController {
    cache: ServiceClientCache,
}

impl FailoverController {
    /// Create a controller with default client configuration.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        Self::with_config(config, ClientConfig::default())
    }

    /// Create a controller with custom client configuration.
    pub fn with_config(config: AdapterConfig, client_config: ClientConfig) -> Result<Self> {
        Ok(Self {
            cache: ServiceClientCache::new(config, client_config)?,
        })
    }

    /// Create a controller with a host-supplied credential store.
    pub fn with_credentials(
        config: AdapterConfig,
        client_config: ClientConfig,
        credentials: CredentialStore,
    ) -> Result<Self> {
        Ok(Self {
            cache: ServiceClientCache::with_credentials(config, client_config, credentials)?,
        })
    }

    /// The underlying service client cache.
    pub fn cache(&self) -> &ServiceClientCache {
        &self.cache
    }

    /// Drop the cached client and token for a caller, forcing re-authentication.
    pub fn evict(&self, entity: &str, ctx: &CallContext) {
        self.cache.evict(&CacheKey::for_call(entity, ctx));
    }

    /// Execute a call with rate-limit backoff and base-URL failover.
    ///
    /// With `N` base URLs, connection failures fail over until all `N` have
    /// been tried. A 401 evicts the caller's client and token and is returned
    /// without retry.
    #[instrument(
        skip(self, body, options, ctx),
        fields(entity = %entity, method = %method, path = %path)
    )]
    pub async fn execute(
        &self,
        entity: &str,
        method: RequestMethod,
        path: &str,
        body: Option<&serde_json::Value>,
        options: &RequestOptions,
        ctx: &CallContext,
    ) -> Result<Response> {
        let key = CacheKey::for_call(entity, ctx);
        let absolute = is_absolute_url(path);
        let base_urls = if absolute {
            1
        } else {
            self.cache.config().entity(entity)?.base_urls.len()
        };
        let start = self.cache.base_index(&key).unwrap_or(0);
        let mut policy =
            FailoverPolicy::new(self.cache.executor().config().retry.clone(), base_urls)
                .starting_at(start);

        loop {
            let result = match self
                .cache
                .get_service_client(entity, method, path, options, ctx)
                .await
            {
                Ok(request) => self.cache.executor().do_request_once(&request, body).await,
                Err(err) => Err(err),
            };

            let err = match result {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if err.is_auth_error() {
                if !absolute {
                    warn!(key = %key, "Unauthorized, evicting service client");
                    self.cache.evict(&key);
                }
                return Err(err);
            }

            match policy.on_failure(&err) {
                RetryDecision::Retry { wait, base_index } => {
                    warn!(
                        attempt = policy.attempt(),
                        delay_ms = wait.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                    if let Some(index) = base_index {
                        self.cache.failover(&key, index);
                    }
                }
                RetryDecision::Stop => {
                    if err.is_not_found() {
                        debug!(error = %err, "Resource not found");
                    } else {
                        error!(attempt = policy.attempt(), error = %err, "Request failed");
                    }
                    return Err(err);
                }
            }
        }
    }
}
