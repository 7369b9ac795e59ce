//! Operation entry points exposed to the host gateway.
//!
//! The adapter wraps a [`FailoverController`] and provides the five generic
//! operations (create, update, partial update, read, delete) against the
//! Books resource.

use restbridge_auth::{CallContext, CredentialStore};
use restbridge_client::{AdapterConfig, ClientConfig, FailoverController};

use crate::error::{Error, Result};

mod crud;

/// REST adapter for one set of configured entities.
///
/// # Example
///
/// ```rust,ignore
/// use restbridge_ops::RestAdapter;
/// use restbridge_client::AdapterConfig;
///
/// let adapter = RestAdapter::new(AdapterConfig::from_path("adapter.json")?)?;
///
/// let created = adapter
///     .create("books", &json!({"eventName": "E", "subjectName": "S", "userID": "U"}))
///     .await?;
///
/// adapter.partial_update("books", "1", &json!({"subjectName": "S2"})).await?;
/// adapter.delete("books", "1").await?;
/// ```
#[derive(Debug)]
pub struct RestAdapter {
    controller: FailoverController,
}

impl RestAdapter {
    /// Create an adapter with default client configuration.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        Ok(Self::from_controller(FailoverController::new(config)?))
    }

    /// Create an adapter with custom client configuration.
    pub fn with_config(config: AdapterConfig, client_config: ClientConfig) -> Result<Self> {
        Ok(Self::from_controller(FailoverController::with_config(
            config,
            client_config,
        )?))
    }

    /// Create an adapter with a host-supplied credential store.
    pub fn with_credentials(
        config: AdapterConfig,
        client_config: ClientConfig,
        credentials: CredentialStore,
    ) -> Result<Self> {
        Ok(Self::from_controller(FailoverController::with_credentials(
            config,
            client_config,
            credentials,
        )?))
    }

    /// Create an adapter from an existing controller.
    pub fn from_controller(controller: FailoverController) -> Self {
        Self { controller }
    }

    /// Bind the operations to an inbound call's context.
    ///
    /// The plain methods on `RestAdapter` run without pass-through
    /// credentials; use this when the call carries an `Authorization` header.
    pub fn call<'a>(&'a self, context: &'a CallContext) -> Call<'a> {
        Call {
            controller: &self.controller,
            context,
        }
    }

    /// Get the underlying controller.
    pub fn inner(&self) -> &FailoverController {
        &self.controller
    }
}

/// Operations bound to one inbound call.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    controller: &'a FailoverController,
    context: &'a CallContext,
}

fn require_entity(entity: &str) -> Result<()> {
    if entity.trim().is_empty() {
        return Err(Error::validation("entity is required"));
    }
    Ok(())
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::validation("id is required"));
    }
    Ok(id)
}
