//! Request and response shapes for the MSP gateway resource API.
//!
//! Records are opaque JSON objects; only the create payload has a fixed
//! shape. Field names are snake_case to match the API's JSON format.

use serde::Serialize;
use serde_json::{Map, Value};

/// A resource record as returned by the server. Passed through untouched.
pub type Record = Map<String, Value>;

/// Provenance tag applied when the caller does not supply one.
pub const DEFAULT_CREATE_VIA: &str = "api";

/// Body of POST /<collection>.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewRecord {
    pub email: String,
    /// Write-only; never expected back from the server.
    pub password: String,
    pub display_name: String,
    /// Provenance tag (`direct`, `api`, `portal`, ...). Forwarded as-is.
    pub create_via: String,
}

impl NewRecord {
    pub fn new(email: &str, password: &str, display_name: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
            display_name: display_name.trim().to_string(),
            create_via: DEFAULT_CREATE_VIA.to_string(),
        }
    }

    pub fn with_create_via(mut self, create_via: &str) -> Self {
        self.create_via = create_via.trim().to_string();
        self
    }

    /// Name of the first required field that is empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.email.is_empty() {
            Some("email")
        } else if self.password.is_empty() {
            Some("password")
        } else if self.display_name.is_empty() {
            Some("display_name")
        } else {
            None
        }
    }
}

/// Outcome of a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The server applied the change and returned the updated record.
    Updated(Value),
    /// Nothing to change; no request was sent.
    Unchanged,
}

/// Find the record array in a list response.
///
/// Accepts a bare array or an array wrapped under `data`, `items` or the
/// collection name. Non-object entries are skipped. `None` means no array
/// was found at all, which is different from an empty one.
pub fn record_list<'a>(value: &'a Value, collection: &str) -> Option<Vec<&'a Record>> {
    let items = match value {
        Value::Array(items) => Some(items),
        Value::Object(obj) => ["data", "items", collection]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array)),
        _ => None,
    }?;
    Some(items.iter().filter_map(Value::as_object).collect())
}

/// Like `record_list`, but an unrecognised shape yields no records.
pub fn records<'a>(value: &'a Value, collection: &str) -> Vec<&'a Record> {
    record_list(value, collection).unwrap_or_else(|| {
        log::debug!("List response has no recognisable record array");
        Vec::new()
    })
}
