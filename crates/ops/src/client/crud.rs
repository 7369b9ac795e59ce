use restbridge_auth::CallContext;
use restbridge_client::{RequestMethod, RequestOptions, Response};
use serde_json::Value;
use tracing::instrument;

use super::{require_entity, require_id, Call, RestAdapter};
use crate::books::{record_id, record_path, BookEvent, BOOKS_PATH};
use crate::error::{Error, Result};

impl Call<'_> {
    /// Create a record. The outbound `ID` is always 1; the service assigns
    /// the real one.
    #[instrument(skip(self, payload))]
    pub async fn create(&self, entity: &str, payload: &Value) -> Result<Value> {
        require_entity(entity)?;
        let event = BookEvent::from_payload(payload)?;
        event.require_all()?;

        let body = serde_json::to_value(event.into_book(Some(Value::from(1))))
            .map_err(|e| Error::validation(e.to_string()))?;
        self.send(
            entity,
            RequestMethod::Post,
            BOOKS_PATH,
            Some(&body),
            &RequestOptions::new(),
        )
            .await
    }

    /// Replace a record.
    #[instrument(skip(self, payload))]
    pub async fn update(&self, entity: &str, id: &str, payload: &Value) -> Result<Value> {
        require_entity(entity)?;
        let id = require_id(id)?;
        let event = BookEvent::from_payload(payload)?;
        event.require_all()?;

        let body = serde_json::to_value(event.into_book(Some(record_id(id))))
            .map_err(|e| Error::validation(e.to_string()))?;
        self.send(
            entity,
            RequestMethod::Put,
            &record_path(id),
            Some(&body),
            &RequestOptions::new(),
        )
            .await
    }

    /// Update the fields present in the payload.
    #[instrument(skip(self, payload))]
    pub async fn partial_update(&self, entity: &str, id: &str, payload: &Value) -> Result<Value> {
        require_entity(entity)?;
        let id = require_id(id)?;
        let event = BookEvent::from_payload(payload)?;
        event.require_any()?;

        let body = serde_json::to_value(event.into_book(Some(record_id(id))))
            .map_err(|e| Error::validation(e.to_string()))?;
        self.send(
            entity,
            RequestMethod::Patch,
            &record_path(id),
            Some(&body),
            &RequestOptions::new(),
        )
        .await
    }

    /// List records, or fetch one when `id` is given.
    ///
    /// `query` pairs are appended as the URL query string. Scalar fields of
    /// an object `payload` are appended as further filters.
    #[instrument(skip(self, payload))]
    pub async fn read(
        &self,
        entity: &str,
        id: Option<&str>,
        query: &[(&str, &str)],
        payload: Option<&Value>,
    ) -> Result<Value> {
        require_entity(entity)?;
        let path = match id {
            Some(id) => record_path(require_id(id)?),
            None => BOOKS_PATH.to_string(),
        };

        let mut options = RequestOptions::new();
        for (name, value) in query {
            options = options.query(*name, *value);
        }
        match payload {
            None | Some(Value::Null) => {}
            Some(Value::Object(filters)) => {
                for (name, value) in filters {
                    match value {
                        Value::Null => {}
                        Value::String(s) => options = options.query(name.clone(), s.clone()),
                        Value::Bool(_) | Value::Number(_) => {
                            options = options.query(name.clone(), value.to_string())
                        }
                        _ => {
                            return Err(Error::validation(format!(
                                "filter '{}' must be a scalar value",
                                name
                            )))
                        }
                    }
                }
            }
            Some(_) => return Err(Error::validation("payload must be a JSON object")),
        }

        self.send(entity, RequestMethod::Get, &path, None, &options)
            .await
    }

    /// Delete a record.
    #[instrument(skip(self))]
    pub async fn delete(&self, entity: &str, id: &str) -> Result<Value> {
        require_entity(entity)?;
        let id = require_id(id)?;
        self.send(
            entity,
            RequestMethod::Delete,
            &record_path(id),
            None,
            &RequestOptions::new(),
        )
            .await
    }

    async fn send(
        &self,
        entity: &str,
        method: RequestMethod,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.controller
            .execute(entity, method, path, body, options, self.context)
            .await
            .map(Response::into_body)
            .map_err(Into::into)
    }
}

impl RestAdapter {
    /// Create a record without pass-through credentials.
    pub async fn create(&self, entity: &str, payload: &Value) -> Result<Value> {
        self.call(&CallContext::default())
            .create(entity, payload)
            .await
    }

    /// Replace a record without pass-through credentials.
    pub async fn update(&self, entity: &str, id: &str, payload: &Value) -> Result<Value> {
        self.call(&CallContext::default())
            .update(entity, id, payload)
            .await
    }

    /// Partially update a record without pass-through credentials.
    pub async fn partial_update(&self, entity: &str, id: &str, payload: &Value) -> Result<Value> {
        self.call(&CallContext::default())
            .partial_update(entity, id, payload)
            .await
    }

    /// Read records without pass-through credentials.
    pub async fn read(
        &self,
        entity: &str,
        id: Option<&str>,
        query: &[(&str, &str)],
        payload: Option<&Value>,
    ) -> Result<Value> {
        self.call(&CallContext::default())
            .read(entity, id, query, payload)
            .await
    }

    /// Delete a record without pass-through credentials.
    pub async fn delete(&self, entity: &str, id: &str) -> Result<Value> {
        self.call(&CallContext::default()).delete(entity, id).await
    }
}
