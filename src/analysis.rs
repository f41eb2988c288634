//! Email content analysis via the gateway's analysis endpoint.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, ClientError};

/// Default path of the analysis endpoint, relative to the base URL.
pub const DEFAULT_ANALYZE_PATH: &str = "/analyze";

/// Body of POST /analyze.
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub content: &'a str,
}

/// Submit free-text email content and return the server's analysis.
pub async fn analyze(api: &ApiClient, path: &str, content: &str) -> Result<Value, ClientError> {
    if content.trim().is_empty() {
        return Err(ClientError::InvalidInput("email content is empty".into()));
    }
    let body = serde_json::to_value(AnalyzeRequest { content })
        .map_err(|e| ClientError::InvalidInput(e.to_string()))?;
    log::debug!("Submitting {} bytes of email content for analysis", content.len());
    api.send_json(Method::POST, path, Some(&body)).await
}
