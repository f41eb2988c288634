//! CRUD operations on a single collection resource.
//!
//! Every operation is one stateless round trip that returns
//! `Result<_, ClientError>`; nothing is retried and nothing is cached here.

use reqwest::Method;
use serde_json::Value;

use super::client::ApiClient;
use super::error::ClientError;
use super::types::{NewRecord, Record, UpdateOutcome};

/// Default collection managed by the console.
pub const DEFAULT_COLLECTION: &str = "enboxes";

pub struct ResourceClient {
    api: ApiClient,
    collection: String,
}

impl ResourceClient {
    pub fn new(api: ApiClient, collection: &str) -> Self {
        Self {
            api,
            collection: collection.trim_matches('/').to_string(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// GET /<collection>
    pub async fn list(&self) -> Result<Value, ClientError> {
        self.api
            .send_json(Method::GET, &self.collection_path(), None)
            .await
    }

    /// POST /<collection>
    ///
    /// Returns the created record exactly as the server sent it.
    pub async fn create(&self, record: &NewRecord) -> Result<Value, ClientError> {
        if let Some(field) = record.missing_field() {
            return Err(ClientError::InvalidInput(format!("{} is required", field)));
        }
        let body = serde_json::to_value(record)
            .map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        self.api
            .send_json(Method::POST, &self.collection_path(), Some(&body))
            .await
    }

    /// GET /<collection>/<id>
    pub async fn get(&self, id: &str) -> Result<Value, ClientError> {
        let path = self.item_path(id)?;
        self.api.send_json(Method::GET, &path, None).await
    }

    /// PATCH /<collection>/<id> with only the supplied fields.
    ///
    /// An empty field map is a no-op: no request is sent and
    /// `UpdateOutcome::Unchanged` is returned.
    pub async fn update(&self, id: &str, fields: &Record) -> Result<UpdateOutcome, ClientError> {
        let path = self.item_path(id)?;
        if fields.is_empty() {
            log::debug!("Update of {} skipped: no fields supplied", path);
            return Ok(UpdateOutcome::Unchanged);
        }
        let body = Value::Object(fields.clone());
        self.api
            .send_json(Method::PATCH, &path, Some(&body))
            .await
            .map(UpdateOutcome::Updated)
    }

    /// DELETE /<collection>/<id>
    ///
    /// Returns the server's acknowledgment payload (`null` when empty).
    pub async fn delete(&self, id: &str) -> Result<Value, ClientError> {
        let path = self.item_path(id)?;
        self.api.send_json(Method::DELETE, &path, None).await
    }

    fn collection_path(&self) -> String {
        format!("/{}", self.collection)
    }

    fn item_path(&self, id: &str) -> Result<String, ClientError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ClientError::InvalidInput("id is required".into()));
        }
        Ok(format!("/{}/{}", self.collection, urlencoding::encode(id)))
    }
}
