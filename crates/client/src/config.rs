//! Client and entity configuration.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use restbridge_auth::AuthConfig;
use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};
use crate::retry::{RateLimitDetector, RetryConfig};

/// Configuration for the HTTP layer.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retry and rate-limit configuration.
    pub retry: RetryConfig,
    /// Idle read timeout per request.
    pub timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Whether to enable request/response tracing.
    pub enable_tracing: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(60),
            user_agent: crate::USER_AGENT.to_string(),
            enable_tracing: true,
        }
    }
}

impl ClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Replace the rate-limit message detector.
    pub fn with_rate_limit_detector(mut self, detector: RateLimitDetector) -> Self {
        self.config.retry.detector = detector;
        self
    }

    /// Set the idle read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable request/response tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.config.enable_tracing = enabled;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Forward proxy settings.
#[derive(Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://proxy.internal:3128`.
    pub host: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Username and password, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Static HTTP options merged into every request of an entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Configuration of one downstream endpoint ("baseEntity").
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    /// Base URLs in failover order.
    #[serde(default)]
    pub base_urls: Vec<String>,
    #[serde(flatten)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub options: Option<HttpOptions>,
}

impl EntityConfig {
    /// Entity with the given base URLs and no authentication.
    pub fn new<I, S>(base_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_urls: base_urls.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .get_or_insert_with(HttpOptions::default)
            .headers
            .insert(name.into(), value.into());
        self
    }
}

/// All entities served by one adapter instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub entities: HashMap<String, EntityConfig>,
}

impl AdapterConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::with_source(
                ErrorKind::Configuration(format!("invalid adapter configuration: {}", e)),
                e,
            )
        })
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::with_source(
                ErrorKind::Configuration(format!("cannot read {}: {}", path.display(), e)),
                e,
            )
        })?;
        Self::from_json_str(&contents)
    }

    /// Add or replace an entity.
    pub fn with_entity(mut self, name: impl Into<String>, entity: EntityConfig) -> Self {
        self.entities.insert(name.into(), entity);
        self
    }

    /// Look up an entity, failing with a configuration error when unknown.
    pub fn entity(&self, name: &str) -> Result<&EntityConfig> {
        self.entities
            .get(name)
            .ok_or_else(|| Error::config(format!("unknown entity '{}'", name)))
    }
}
