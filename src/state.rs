//! Console session state.
//!
//! Owns the resource client and the cached snapshot of the last fetched
//! list. The snapshot is advisory: it is emptied after every mutation so the
//! next read goes back to the server.

use std::time::Instant;

use serde_json::Value;

use crate::api::types::{self, NewRecord, Record, UpdateOutcome};
use crate::api::{ClientError, ResourceClient};

/// Last successfully fetched list response.
pub struct CachedList {
    pub value: Value,
    fetched_at: Instant,
}

impl CachedList {
    /// Seconds since the snapshot was fetched.
    pub fn age_secs(&self) -> u64 {
        self.fetched_at.elapsed().as_secs()
    }
}

/// State for one console session (a single one-shot command or a whole
/// interactive shell).
pub struct Session {
    resources: ResourceClient,
    snapshot: Option<CachedList>,
}

impl Session {
    pub fn new(resources: ResourceClient) -> Self {
        Self {
            resources,
            snapshot: None,
        }
    }

    pub fn resources(&self) -> &ResourceClient {
        &self.resources
    }

    /// The cached list, fetching it first when empty or when `refresh` is set.
    ///
    /// Only a successful fetch replaces the snapshot; a failed refresh leaves
    /// the previous one untouched.
    pub async fn list(&mut self, refresh: bool) -> Result<&CachedList, ClientError> {
        let cached = match self.snapshot.take() {
            Some(cached) if !refresh => {
                log::debug!("Serving cached list ({}s old)", cached.age_secs());
                cached
            }
            previous => match self.resources.list().await {
                Ok(value) => {
                    log::debug!(
                        "Cached {} record(s) from /{}",
                        types::records(&value, self.resources.collection()).len(),
                        self.resources.collection()
                    );
                    CachedList {
                        value,
                        fetched_at: Instant::now(),
                    }
                }
                Err(e) => {
                    self.snapshot = previous;
                    return Err(e);
                }
            },
        };
        Ok(self.snapshot.insert(cached))
    }

    pub async fn get(&self, id: &str) -> Result<Value, ClientError> {
        self.resources.get(id).await
    }

    pub async fn create(&mut self, record: &NewRecord) -> Result<Value, ClientError> {
        let result = self.resources.create(record).await;
        self.invalidate_after(&result);
        result
    }

    pub async fn update(&mut self, id: &str, fields: &Record) -> Result<UpdateOutcome, ClientError> {
        let result = self.resources.update(id, fields).await;
        if !matches!(result, Ok(UpdateOutcome::Unchanged)) {
            self.invalidate_after(&result);
        }
        result
    }

    pub async fn delete(&mut self, id: &str) -> Result<Value, ClientError> {
        let result = self.resources.delete(id).await;
        self.invalidate_after(&result);
        result
    }

    /// Drop the cached list.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot.is_some()
    }

    /// A mutation that never left the process cannot have changed the
    /// server, so caller-side validation failures keep the snapshot.
    fn invalidate_after<T>(&mut self, result: &Result<T, ClientError>) {
        if !matches!(result, Err(ClientError::InvalidInput(_))) {
            self.invalidate();
        }
    }
}
