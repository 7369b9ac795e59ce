//! Access tokens and the per-(entity, identity) token cache.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::credentials::{CacheKey, CallContext, CredentialStore, OAuthSettings};
use crate::error::{Error, Result};
use crate::oauth::TokenClient;

/// Tokens closer than this to their expiry are refreshed before use.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// A bearer token with an absolute expiry.
///
/// The token value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    valid_to: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("valid_to", &self.valid_to)
            .finish()
    }
}

impl AccessToken {
    pub fn new(token: impl Into<String>, valid_to: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            valid_to,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn valid_to(&self) -> DateTime<Utc> {
        self.valid_to
    }

    /// True while `valid_to >= now + 30s`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_to >= now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    /// `Authorization` header value for this token.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Cache of one access token per `(entity, client identity)`.
///
/// All acquisitions are serialized through a single process-wide async lock,
/// so two callers needing the same token never both hit the token endpoint:
/// the second one finds the first one's result in the cache. Acquisitions for
/// unrelated keys serialize as well.
#[derive(Debug)]
pub struct TokenCache {
    tokens: Mutex<HashMap<CacheKey, AccessToken>>,
    acquisition: tokio::sync::Mutex<()>,
    client: TokenClient,
    credentials: CredentialStore,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_parts(TokenClient::default(), CredentialStore::default())
    }

    pub fn with_parts(client: TokenClient, credentials: CredentialStore) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            acquisition: tokio::sync::Mutex::new(()),
            client,
            credentials,
        }
    }

    /// The credential store used to resolve client secrets.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Return a fresh token for the call, acquiring one if needed.
    ///
    /// The acquisition lock guard is dropped on every return path, including
    /// configuration and token-endpoint failures.
    pub async fn get_access_token(
        &self,
        entity: &str,
        oauth: &OAuthSettings,
        ctx: &CallContext,
    ) -> Result<AccessToken> {
        self.get_access_token_with(&self.client, entity, oauth, ctx)
            .await
    }

    /// Like [`get_access_token`](Self::get_access_token), but requests a new
    /// token through `client`, e.g. one routed via the entity's proxy.
    #[instrument(skip(self, client, oauth, ctx), fields(entity = %entity))]
    pub async fn get_access_token_with(
        &self,
        client: &TokenClient,
        entity: &str,
        oauth: &OAuthSettings,
        ctx: &CallContext,
    ) -> Result<AccessToken> {
        let key = CacheKey::for_call(entity, ctx);
        let _guard = self.acquisition.lock().await;

        if let Some(token) = self.cached(&key).filter(AccessToken::is_fresh) {
            debug!(key = %key, "Using cached access token");
            return Ok(token);
        }

        let secret = self.credentials.oauth_secret(entity, oauth).ok_or_else(|| {
            Error::config(format!("entity '{}': oauth.clientSecret is missing", entity))
        })?;

        let token = client.client_credentials(entity, oauth, &secret).await?;
        info!(key = %key, valid_to = %token.valid_to(), "Acquired access token");

        self.store(key, token.clone());
        Ok(token)
    }

    /// Look up a cached token regardless of its freshness.
    pub fn cached(&self, key: &CacheKey) -> Option<AccessToken> {
        self.lock_tokens().get(key).cloned()
    }

    /// Insert or replace a token.
    pub fn store(&self, key: CacheKey, token: AccessToken) {
        self.lock_tokens().insert(key, token);
    }

    /// Remove the token for a key.
    pub fn evict(&self, key: &CacheKey) -> Option<AccessToken> {
        self.lock_tokens().remove(key)
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, AccessToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
