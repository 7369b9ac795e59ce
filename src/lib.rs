//! # restbridge
//!
//! Outbound REST request engine for a host gateway plugin.
//!
//! Generic CRUD calls from the gateway are translated into HTTP requests
//! against configured downstream services, with authentication, token
//! caching, rate-limit backoff and base-URL failover handled in one place.
//!
//! ## Security
//!
//! - Secrets, tokens and `Authorization` headers are redacted in Debug output
//! - Tracing spans skip credential parameters
//! - Cache keys are derived from hashed credentials, never raw secrets
//!
//! ## Crates
//!
//! - **restbridge-auth** - Credential resolution, auth-mode selection, OAuth token cache
//! - **restbridge-client** - Entity configuration, service client cache, request execution, failover
//! - **restbridge-ops** - Operation handlers (create, update, partial update, read, delete)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restbridge::{AdapterConfig, RestAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     restbridge::init_tracing();
//!
//!     let adapter = RestAdapter::new(AdapterConfig::from_path("adapter.json")?)?;
//!     let created = adapter
//!         .create(
//!             "books",
//!             &serde_json::json!({"eventName": "E", "subjectName": "S", "userID": "U"}),
//!         )
//!         .await?;
//!     println!("{}", created);
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "auth")]
pub use restbridge_auth as auth;
#[cfg(feature = "client")]
pub use restbridge_client as client;
#[cfg(feature = "ops")]
pub use restbridge_ops as ops;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use restbridge_auth::{AuthConfig, CallContext, CredentialStore, SecretResolver};
#[cfg(feature = "client")]
pub use restbridge_client::{AdapterConfig, ClientConfig, EntityConfig, FailoverController};
#[cfg(feature = "ops")]
pub use restbridge_ops::RestAdapter;

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
