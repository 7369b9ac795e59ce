//! # restbridge-client
//!
//! Outbound request engine for downstream REST services.
//!
//! This crate provides:
//! - Per-entity configuration with ordered base URLs, auth and proxy settings
//! - A cache of service clients keyed by entity and caller identity
//! - Single-call execution with JSON or form bodies
//! - Rate-limit backoff and base-URL failover
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Operation Handlers                        │
//! │  (restbridge-ops)                                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   FailoverController                        │
//! │  - Rate-limit backoff, base-URL failover, 401 eviction      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ServiceClientCache                        │
//! │  - Auth mode selection, token refresh, proxy agents         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   RequestExecutor                           │
//! │  - One HTTP call, body encoding, response parsing           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use restbridge_client::{AdapterConfig, FailoverController, RequestMethod, RequestOptions};
//! use restbridge_auth::CallContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restbridge_client::Error> {
//!     let config = AdapterConfig::from_path("adapter.json")?;
//!     let controller = FailoverController::new(config)?;
//!
//!     let response = controller
//!         .execute(
//!             "books",
//!             RequestMethod::Get,
//!             "/api/v1/Books",
//!             None,
//!             &RequestOptions::new(),
//!             &CallContext::default(),
//!         )
//!         .await?;
//!     println!("{}", response.body);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod executor;
mod request;
mod response;
mod retry;
mod service_client;

pub use client::FailoverController;
pub use config::{
    AdapterConfig, ClientConfig, ClientConfigBuilder, EntityConfig, HttpOptions, ProxyConfig,
};
pub use error::{ConnectionFailure, Error, ErrorKind, Result};
pub use executor::RequestExecutor;
pub use request::{Headers, RequestMethod, RequestOptions, ResolvedRequest};
pub use response::{parse_body, Response};
pub use retry::{FailoverPolicy, RateLimitDetector, RetryConfig, RetryDecision};
pub use service_client::{is_absolute_url, ServiceClientCache};

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("restbridge/", env!("CARGO_PKG_VERSION"));
