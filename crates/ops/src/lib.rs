//! # restbridge-ops
//!
//! Operation handlers for the host gateway.
//!
//! Each operation validates its input, maps it onto a method, path and body
//! for the downstream service, and delegates to the request engine for
//! authentication, retry and failover.
//!
//! ## Operations
//!
//! - **create** - `POST /api/v1/Books`
//! - **update** - `PUT /api/v1/Books/{id}`
//! - **partial_update** - `PATCH /api/v1/Books/{id}`
//! - **read** - `GET /api/v1/Books` or `GET /api/v1/Books/{id}`
//! - **delete** - `DELETE /api/v1/Books/{id}`
//!
//! ## Example
//!
//! ```rust,ignore
//! use restbridge_ops::RestAdapter;
//! use restbridge_client::AdapterConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restbridge_ops::Error> {
//!     let adapter = RestAdapter::new(AdapterConfig::from_path("adapter.json")?)?;
//!
//!     let books = adapter.read("books", None, &[("top", "10")], None).await?;
//!     println!("{}", books);
//!     Ok(())
//! }
//! ```

pub mod books;
mod client;
mod error;

pub use books::{Book, BookEvent, BOOKS_PATH};
pub use client::{Call, RestAdapter};
pub use error::{Error, ErrorKind, Result};
