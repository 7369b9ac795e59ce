//! Per-identity cache of configured service clients.
//!
//! A service client is everything needed to address one entity on behalf of
//! one caller: the current base URL, the selected authentication mode, the
//! current access token and the HTTP agent (proxied or not). Clients are
//! created lazily, updated in place on token refresh and failover, and
//! evicted after a 401 or a failed refresh.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use restbridge_auth::{
    AccessToken, AuthMode, CacheKey, CallContext, CredentialStore, OAuthSettings, TokenCache,
    TokenClient,
};
use tracing::{debug, info, instrument, warn};

use crate::config::{AdapterConfig, ClientConfig, EntityConfig};
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::request::{Headers, RequestMethod, RequestOptions, ResolvedRequest, AUTHORIZATION};

#[derive(Clone)]
struct ServiceClient {
    base_index: usize,
    base_url: String,
    mode: AuthMode,
    token: Option<AccessToken>,
    headers: Headers,
    http: reqwest::Client,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_index", &self.base_index)
            .field("base_url", &self.base_url)
            .field("mode", &self.mode.name())
            .field("token", &self.token)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Cache of service clients keyed by `(entity, client identity)`.
#[derive(Debug)]
pub struct ServiceClientCache {
    config: Arc<AdapterConfig>,
    executor: RequestExecutor,
    clients: Mutex<HashMap<CacheKey, ServiceClient>>,
    tokens: TokenCache,
}

impl ServiceClientCache {
    /// Create a cache resolving secrets verbatim from the configuration.
    pub fn new(config: AdapterConfig, client_config: ClientConfig) -> Result<Self> {
        Self::with_credentials(config, client_config, CredentialStore::default())
    }

    /// Create a cache with a host-supplied credential store.
    pub fn with_credentials(
        config: AdapterConfig,
        client_config: ClientConfig,
        credentials: CredentialStore,
    ) -> Result<Self> {
        let executor = RequestExecutor::new(client_config)?;
        let token_client = TokenClient::new(executor.http_client(None)?);
        Ok(Self {
            config: Arc::new(config),
            executor,
            clients: Mutex::new(HashMap::new()),
            tokens: TokenCache::with_parts(token_client, credentials),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// Resolve the request configuration for one call.
    ///
    /// An absolute `http(s)` URL in `path` yields a one-off request that
    /// bypasses the cache and token logic. Otherwise the cached client for
    /// the caller is created or reused, and an expiring OAuth token is
    /// refreshed first. The result is always an owned copy.
    #[instrument(skip(self, options, ctx), fields(entity = %entity, method = %method))]
    pub async fn get_service_client(
        &self,
        entity: &str,
        method: RequestMethod,
        path: &str,
        options: &RequestOptions,
        ctx: &CallContext,
    ) -> Result<ResolvedRequest> {
        if is_absolute_url(path) {
            return self.one_off(entity, method, path, options);
        }

        let key = CacheKey::for_call(entity, ctx);
        let cached = self.lock_clients().get(&key).cloned();
        let client = match cached {
            Some(client) => self.refresh_if_needed(&key, entity, client, ctx).await?,
            None => self.create(&key, entity, ctx).await?,
        };

        let mut url = url::Url::parse(&join_url(&client.base_url, path))?;
        append_query(&mut url, options);

        let mut headers = client.headers;
        options.apply_headers(&mut headers);

        Ok(ResolvedRequest {
            method,
            url,
            headers,
            http: client.http,
        })
    }

    /// Move a cached client to `baseUrls[index]`.
    ///
    /// Returns the new base URL, or `None` when there is no cached client or
    /// the index is out of range.
    pub fn failover(&self, key: &CacheKey, index: usize) -> Option<String> {
        let entity = self.config.entities.get(&key.entity)?;
        let base_url = entity.base_urls.get(index)?.clone();

        let mut clients = self.lock_clients();
        let client = clients.get_mut(key)?;
        client.base_index = index;
        client.base_url = base_url.clone();
        info!(key = %key, base_url = %base_url, "Failing over to next base URL");
        Some(base_url)
    }

    /// Drop the cached client and access token for a key.
    pub fn evict(&self, key: &CacheKey) {
        let removed = self.lock_clients().remove(key).is_some();
        self.tokens.evict(key);
        if removed {
            debug!(key = %key, "Evicted service client");
        }
    }

    /// Returns true if a client is cached for the key.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock_clients().contains_key(key)
    }

    /// Index into `baseUrls` of a cached client.
    pub fn base_index(&self, key: &CacheKey) -> Option<usize> {
        self.lock_clients().get(key).map(|c| c.base_index)
    }

    /// Current base URL of a cached client.
    pub fn base_url(&self, key: &CacheKey) -> Option<String> {
        self.lock_clients().get(key).map(|c| c.base_url.clone())
    }

    async fn create(
        &self,
        key: &CacheKey,
        entity: &str,
        ctx: &CallContext,
    ) -> Result<ServiceClient> {
        let config = self.config.entity(entity)?;
        let base_url = config
            .base_urls
            .first()
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .ok_or_else(|| Error::config(format!("entity '{}': baseUrls is empty", entity)))?;

        let mode = self
            .tokens
            .credentials()
            .select_mode(entity, &config.auth, ctx)?;

        let mut headers = Headers::json();
        merge_static_headers(&mut headers, config);

        let http = self.executor.http_client(config.proxy.as_ref())?;

        let token = match &mode {
            AuthMode::OAuth(oauth) => Some(self.acquire_token(&http, entity, oauth, ctx).await?),
            _ => None,
        };
        if let Some(value) = mode.authorization_header() {
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(token) = &token {
            headers.insert(AUTHORIZATION, token.authorization_header());
        }

        let client = ServiceClient {
            base_index: 0,
            base_url,
            mode,
            token,
            headers,
            http,
        };
        info!(
            key = %key,
            mode = client.mode.name(),
            base_url = %client.base_url,
            "Created service client"
        );

        let stored = self
            .lock_clients()
            .entry(key.clone())
            .or_insert(client)
            .clone();
        Ok(stored)
    }

    async fn refresh_if_needed(
        &self,
        key: &CacheKey,
        entity: &str,
        client: ServiceClient,
        ctx: &CallContext,
    ) -> Result<ServiceClient> {
        let AuthMode::OAuth(oauth) = &client.mode else {
            return Ok(client);
        };
        if client.token.as_ref().is_some_and(AccessToken::is_fresh) {
            return Ok(client);
        }

        let token = match self.acquire_token(&client.http, entity, oauth, ctx).await {
            Ok(token) => token,
            Err(err) => {
                warn!(key = %key, error = %err, "Token refresh failed, evicting service client");
                self.evict(key);
                return Err(err.into());
            }
        };

        let header = token.authorization_header();
        let mut clients = self.lock_clients();
        let updated = match clients.get_mut(key) {
            Some(cached) => {
                cached.headers.insert(AUTHORIZATION, header);
                cached.token = Some(token);
                cached.clone()
            }
            None => {
                let mut client = client;
                client.headers.insert(AUTHORIZATION, header);
                client.token = Some(token);
                client
            }
        };
        debug!(key = %key, "Refreshed access token");
        Ok(updated)
    }

    /// Token requests go through the same agent as the entity's calls, so a
    /// configured proxy applies to the token endpoint too.
    async fn acquire_token(
        &self,
        http: &reqwest::Client,
        entity: &str,
        oauth: &OAuthSettings,
        ctx: &CallContext,
    ) -> restbridge_auth::Result<AccessToken> {
        let client = TokenClient::new(http.clone());
        self.tokens
            .get_access_token_with(&client, entity, oauth, ctx)
            .await
    }

    fn one_off(
        &self,
        entity: &str,
        method: RequestMethod,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ResolvedRequest> {
        let entity_config = self.config.entities.get(entity);
        let mut url = url::Url::parse(path)?;
        append_query(&mut url, options);

        let mut headers = Headers::json();
        if let Some(config) = entity_config {
            merge_static_headers(&mut headers, config);
        }
        options.apply_headers(&mut headers);

        let http = self
            .executor
            .http_client(entity_config.and_then(|c| c.proxy.as_ref()))?;

        debug!(url = %url, "Using one-off client for absolute URL");
        Ok(ResolvedRequest {
            method,
            url,
            headers,
            http,
        })
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, ServiceClient>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns true if `path` is an absolute `http` or `https` URL.
pub fn is_absolute_url(path: &str) -> bool {
    url::Url::parse(path).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn merge_static_headers(headers: &mut Headers, config: &EntityConfig) {
    if let Some(options) = &config.options {
        headers.merge(&options.headers);
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

fn append_query(url: &mut url::Url, options: &RequestOptions) {
    if !options.query.is_empty() {
        url.query_pairs_mut().extend_pairs(&options.query);
    }
}
