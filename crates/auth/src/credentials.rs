//! Credential configuration, call context and secret resolution.
//!
//! All credential types implement custom Debug to redact sensitive data.

use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Static basic authentication settings (`basicAuth`).
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuth {
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    password: Option<String>,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl BasicAuth {
    /// Create basic auth settings.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// OAuth 2.0 client-credentials settings (`oauth`).
///
/// Either `token_url` or `tenant_id` must be present; the tenant id expands
/// into [`crate::TENANT_TOKEN_URL`].
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSettings {
    /// Client id.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    /// Tenant id used to derive a tenant-specific token endpoint.
    #[serde(default, rename = "tenantIdGUID")]
    pub tenant_id: Option<String>,
    /// Explicit token endpoint.
    #[serde(default)]
    pub token_url: Option<String>,
    /// Optional scope sent with the grant.
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

impl OAuthSettings {
    /// Create settings for the given client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Default::default()
        }
    }

    /// Set the client secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Set an explicit token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Set the tenant id.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub(crate) fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    /// Client id, or a configuration error naming the entity.
    pub fn require_client_id(&self, entity: &str) -> Result<&str> {
        non_empty(self.client_id.as_deref())
            .ok_or_else(|| Error::config(format!("entity '{}': oauth.clientId is missing", entity)))
    }

    /// Resolve the token endpoint: `tokenUrl` wins over `tenantIdGUID`.
    pub fn token_endpoint(&self, entity: &str) -> Result<String> {
        if let Some(url) = non_empty(self.token_url.as_deref()) {
            return Ok(url.to_string());
        }
        if let Some(tenant) = non_empty(self.tenant_id.as_deref()) {
            return Ok(crate::TENANT_TOKEN_URL.replace("{tenant}", tenant));
        }
        Err(Error::config(format!(
            "entity '{}': oauth requires tokenUrl or tenantIdGUID",
            entity
        )))
    }
}

/// Static bearer token settings (`bearerAuth`).
#[derive(Clone, Default, Deserialize)]
pub struct BearerAuth {
    #[serde(default)]
    token: Option<String>,
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl BearerAuth {
    /// Create bearer settings.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// Authentication section of an entity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default)]
    pub oauth: Option<OAuthSettings>,
    #[serde(default)]
    pub bearer_auth: Option<BearerAuth>,
}

/// Authentication mode chosen once when a service client is created.
#[derive(Clone)]
pub enum AuthMode {
    /// No `Authorization` header.
    None,
    /// The caller's own `Authorization` header, forwarded verbatim.
    PassThrough(String),
    /// Static basic credentials.
    Basic { username: String, password: String },
    /// OAuth client credentials; the header comes from the token cache.
    OAuth(OAuthSettings),
    /// Static bearer token.
    Bearer(String),
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::None => f.write_str("None"),
            AuthMode::PassThrough(_) => f.write_str("PassThrough([REDACTED])"),
            AuthMode::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            AuthMode::OAuth(settings) => f.debug_tuple("OAuth").field(settings).finish(),
            AuthMode::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

impl AuthMode {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::PassThrough(_) => "pass-through",
            AuthMode::Basic { .. } => "basic",
            AuthMode::OAuth(_) => "oauth",
            AuthMode::Bearer(_) => "bearer",
        }
    }

    /// The static `Authorization` header value, if this mode has one.
    ///
    /// OAuth returns `None`: its header is derived from the current token.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            AuthMode::None | AuthMode::OAuth(_) => None,
            AuthMode::PassThrough(header) => Some(header.clone()),
            AuthMode::Basic { username, password } => Some(basic_header(username, password)),
            AuthMode::Bearer(token) => Some(format!("Bearer {}", token)),
        }
    }
}

/// Build an `Authorization: Basic ...` header value.
pub fn basic_header(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

/// Per-call context handed over by the host gateway.
#[derive(Clone, Default)]
pub struct CallContext {
    authorization: Option<String>,
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl CallContext {
    /// Context carrying the caller's `Authorization` header.
    pub fn with_authorization(header: impl Into<String>) -> Self {
        Self {
            authorization: Some(header.into()),
        }
    }

    /// The raw pass-through header.
    pub fn authorization(&self) -> Option<&str> {
        non_empty(self.authorization.as_deref())
    }

    /// Decode the pass-through credentials into `(username, secret)`.
    ///
    /// Basic headers yield the decoded user and password; anything else is
    /// treated as a bearer token with no username.
    pub fn credentials(&self) -> Option<(Option<String>, String)> {
        let header = self.authorization()?;
        let (scheme, value) = header.split_once(' ').unwrap_or(("", header));
        if scheme.eq_ignore_ascii_case("basic") {
            if let Some((user, secret)) = base64::engine::general_purpose::STANDARD
                .decode(value.trim())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .and_then(|decoded| {
                    decoded
                        .split_once(':')
                        .map(|(u, s)| (u.to_string(), s.to_string()))
                })
            {
                if !user.is_empty() {
                    return Some((Some(user), secret));
                }
            }
        }
        Some((None, value.trim().to_string()))
    }
}

/// Cache identity of a caller.
///
/// Callers without pass-through credentials share one identity; otherwise the
/// identity is derived from the username and a hash of the secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    const SHARED: &'static str = "shared";

    /// The identity used when no pass-through credentials are present.
    pub fn shared() -> Self {
        Self(Self::SHARED.to_string())
    }

    /// Derive the identity for a call.
    pub fn from_context(ctx: &CallContext) -> Self {
        match ctx.credentials() {
            None => Self::shared(),
            Some((user, secret)) => {
                let digest = Sha256::digest(secret.as_bytes());
                let fingerprint: String = digest
                    .iter()
                    .take(8)
                    .map(|b| format!("{:02x}", b))
                    .collect();
                Self(format!("{}_{}", user.as_deref().unwrap_or("bearer"), fingerprint))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of both the service-client and the access-token cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub entity: String,
    pub identity: ClientIdentity,
}

impl CacheKey {
    pub fn new(entity: impl Into<String>, identity: ClientIdentity) -> Self {
        Self {
            entity: entity.into(),
            identity,
        }
    }

    /// Key for an entity and call context.
    pub fn for_call(entity: &str, ctx: &CallContext) -> Self {
        Self::new(entity, ClientIdentity::from_context(ctx))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity, self.identity)
    }
}

/// Host-supplied secret lookup.
///
/// `field` names the configuration field (`basicAuth.password`,
/// `oauth.clientSecret`, `bearerAuth.token`); `configured` is the raw value
/// from the entity configuration, which may be a reference the host resolves.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, entity: &str, field: &str, configured: Option<&str>) -> Option<String>;
}

/// Resolver that returns configured values verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredSecrets;

impl SecretResolver for ConfiguredSecrets {
    fn resolve(&self, _entity: &str, _field: &str, configured: Option<&str>) -> Option<String> {
        non_empty(configured).map(str::to_string)
    }
}

/// Resolves secrets and selects the authentication mode for an entity.
#[derive(Clone)]
pub struct CredentialStore {
    resolver: Arc<dyn SecretResolver>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(Arc::new(ConfiguredSecrets))
    }
}

impl CredentialStore {
    pub fn new(resolver: Arc<dyn SecretResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve the secret for a call.
    ///
    /// Pass-through credentials win; otherwise the configured secret of the
    /// highest-precedence configured mode (basic, oauth, bearer) is resolved.
    pub fn resolve_secret(
        &self,
        entity: &str,
        auth: &AuthConfig,
        ctx: &CallContext,
    ) -> Option<String> {
        if let Some((_, secret)) = ctx.credentials() {
            return Some(secret);
        }
        if let Some(basic) = &auth.basic_auth {
            return self
                .resolver
                .resolve(entity, "basicAuth.password", basic.password());
        }
        if let Some(oauth) = &auth.oauth {
            return self.oauth_secret(entity, oauth);
        }
        if let Some(bearer) = &auth.bearer_auth {
            return self
                .resolver
                .resolve(entity, "bearerAuth.token", bearer.token.as_deref());
        }
        None
    }

    pub(crate) fn oauth_secret(&self, entity: &str, oauth: &OAuthSettings) -> Option<String> {
        self.resolver
            .resolve(entity, "oauth.clientSecret", oauth.client_secret())
    }

    /// Select and validate the authentication mode.
    ///
    /// Precedence: pass-through header, then basic, oauth, bearer, none.
    pub fn select_mode(
        &self,
        entity: &str,
        auth: &AuthConfig,
        ctx: &CallContext,
    ) -> Result<AuthMode> {
        if let Some(header) = ctx.authorization() {
            return Ok(AuthMode::PassThrough(header.to_string()));
        }

        let secret = self.resolve_secret(entity, auth, ctx);
        let missing =
            |field: &str| Error::config(format!("entity '{}': {} is missing", entity, field));

        if let Some(basic) = &auth.basic_auth {
            let username = non_empty(basic.username.as_deref())
                .ok_or_else(|| missing("basicAuth.username"))?;
            let password = secret.ok_or_else(|| missing("basicAuth.password"))?;
            return Ok(AuthMode::Basic {
                username: username.to_string(),
                password,
            });
        }

        if let Some(oauth) = &auth.oauth {
            oauth.require_client_id(entity)?;
            oauth.token_endpoint(entity)?;
            secret.ok_or_else(|| missing("oauth.clientSecret"))?;
            return Ok(AuthMode::OAuth(oauth.clone()));
        }

        if auth.bearer_auth.is_some() {
            let token = secret.ok_or_else(|| missing("bearerAuth.token"))?;
            return Ok(AuthMode::Bearer(token));
        }

        Ok(AuthMode::None)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
