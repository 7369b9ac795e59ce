//! Books resource mapping.
//!
//! Gateway events carry `eventName`, `subjectName` and `userID`; the Books
//! service stores them as `Title`, `Description` and `Excerpt`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Collection path of the Books resource.
pub const BOOKS_PATH: &str = "/api/v1/Books";

/// Inbound payload shape.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookEvent {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<Value>,
    #[serde(rename = "subjectName", default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<Value>,
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
}

impl BookEvent {
    /// Parse a payload, rejecting anything but a JSON object.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::validation("payload must be a JSON object"));
        }
        serde_json::from_value(payload.clone())
            .map_err(|e| Error::validation(format!("invalid payload: {}", e)))
    }

    /// Fail unless every field is present and non-null.
    pub fn require_all(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("eventName", &self.event_name),
            ("subjectName", &self.subject_name),
            ("userID", &self.user_id),
        ]
        .into_iter()
        .filter(|(_, value)| is_missing(value))
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Fail unless at least one field is present.
    pub fn require_any(&self) -> Result<()> {
        if is_missing(&self.event_name)
            && is_missing(&self.subject_name)
            && is_missing(&self.user_id)
        {
            return Err(Error::validation(
                "payload must contain eventName, subjectName or userID",
            ));
        }
        Ok(())
    }

    /// Map onto the outbound record with the given `ID`.
    pub fn into_book(self, id: Option<Value>) -> Book {
        Book {
            id,
            title: self.event_name.filter(|v| !v.is_null()),
            description: self.subject_name.filter(|v| !v.is_null()),
            excerpt: self.user_id.filter(|v| !v.is_null()),
        }
    }
}

fn is_missing(value: &Option<Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Outbound Books record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Book {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<Value>,
}

/// `ID` of a record addressed by path: numeric ids are sent as numbers.
pub fn record_id(id: &str) -> Value {
    id.parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}

/// Path of a single record.
pub fn record_path(id: &str) -> String {
    format!("{}/{}", BOOKS_PATH, urlencoding::encode(id))
}
