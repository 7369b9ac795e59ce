//! # restbridge-auth
//!
//! Credential resolution and token lifecycle for downstream REST services.
//!
//! ## Security
//!
//! - Secrets and tokens are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - Cache keys are derived from hashed credentials, never raw secrets
//!
//! ## Supported Authentication Modes
//!
//! - **Pass-through** - The caller's own `Authorization` header is forwarded
//! - **Basic** - Static username/password from entity configuration
//! - **OAuth 2.0 Client Credentials** - Tokens are acquired and cached per
//!   `(entity, client identity)` pair
//! - **Bearer** - A static bearer token from entity configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use restbridge_auth::{CallContext, OAuthSettings, TokenCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restbridge_auth::Error> {
//!     let tokens = TokenCache::new();
//!     let oauth = OAuthSettings::new("client-id")
//!         .with_secret("client-secret")
//!         .with_token_url("https://auth.example.com/oauth2/token");
//!
//!     let token = tokens
//!         .get_access_token("books", &oauth, &CallContext::default())
//!         .await?;
//!     println!("valid until {}", token.valid_to());
//!     Ok(())
//! }
//! ```

mod credentials;
mod error;
mod oauth;
mod token;

pub use credentials::{
    basic_header, AuthConfig, AuthMode, BasicAuth, BearerAuth, CacheKey, CallContext,
    ClientIdentity, ConfiguredSecrets, CredentialStore, OAuthSettings, SecretResolver,
};
pub use error::{Error, ErrorKind, Result};
pub use oauth::{TokenClient, TokenResponse};
pub use token::{AccessToken, TokenCache, EXPIRY_MARGIN_SECS};

/// Token endpoint template used when only a tenant id is configured.
pub const TENANT_TOKEN_URL: &str = "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";
