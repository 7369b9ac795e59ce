//! OAuth 2.0 client-credentials grant.
//!
//! Only the client-credentials flow is implemented: the adapter acts as a
//! confidential client on behalf of the host, never on behalf of an end user.

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::credentials::OAuthSettings;
use crate::error::{Error, ErrorKind, Result};
use crate::token::AccessToken;

/// Low-level client for the token endpoint.
#[derive(Clone)]
pub struct TokenClient {
    http_client: reqwest::Client,
}

impl std::fmt::Debug for TokenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClient").finish_non_exhaustive()
    }
}

impl Default for TokenClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl TokenClient {
    /// Create a token client on top of an existing HTTP client.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Request a new access token with the client-credentials grant.
    ///
    /// The secret is not logged to prevent credential exposure. The absolute
    /// expiry is computed locally from `expires_in` so that clock skew between
    /// this host and the token server does not matter.
    #[instrument(skip(self, oauth, secret), fields(entity = %entity))]
    pub async fn client_credentials(
        &self,
        entity: &str,
        oauth: &OAuthSettings,
        secret: &str,
    ) -> Result<AccessToken> {
        let client_id = oauth.require_client_id(entity)?;
        let token_url = url::Url::parse(&oauth.token_endpoint(entity)?)?;

        let mut params = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", secret),
        ];
        if let Some(ref scope) = oauth.scope {
            params.push(("scope", scope.as_str()));
        }
        let body = serde_urlencoded::to_string(params)?;

        debug!(token_url = %token_url, "Requesting access token");

        let response = self
            .http_client
            .post(token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            Error::with_source(
                ErrorKind::Token {
                    error: "invalid_response".to_string(),
                    description: format!(
                        "token endpoint returned HTTP {} with a non-JSON body",
                        status.as_u16()
                    ),
                },
                e,
            )
        })?;

        token.into_access_token(status.as_u16())
    }
}

/// Token endpoint response.
///
/// `expires_in` is accepted as a number or a numeric string since several
/// providers quote it.
#[derive(Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

impl TokenResponse {
    /// Lifetime in seconds, if present and numeric.
    pub fn expires_in_secs(&self) -> Option<i64> {
        match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Validate the response and turn it into an [`AccessToken`].
    pub fn into_access_token(self, status: u16) -> Result<AccessToken> {
        if let Some(error) = self.error.clone() {
            return Err(Error::new(ErrorKind::Token {
                error,
                description: self.error_description.clone().unwrap_or_default(),
            }));
        }

        let expires_in = self.expires_in_secs();
        match (self.access_token, expires_in) {
            (Some(token), Some(expires_in)) if !token.is_empty() => Ok(AccessToken::new(
                token,
                Utc::now() + Duration::seconds(expires_in),
            )),
            _ => Err(Error::new(ErrorKind::Token {
                error: "invalid_response".to_string(),
                description: format!(
                    "token endpoint returned HTTP {} without access_token/expires_in",
                    status
                ),
            })),
        }
    }
}
