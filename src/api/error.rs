//! Error taxonomy for MSP gateway requests.
//!
//! Every failure of an outbound call is converted into a `ClientError` at the
//! point of the HTTP call, so callers only ever see `Result<T, ClientError>`.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of a non-JSON error body kept in a message.
const MAX_RAW_BODY_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, network down.
    #[error("server unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The request exceeded the bounded wait.
    #[error("request timed out after {timeout:?}: {url}")]
    TimedOut { url: String, timeout: Duration },

    /// The server answered with a non-success status.
    #[error("request rejected with HTTP {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    /// Success status, but the body could not be decoded as JSON.
    #[error("malformed response body: {0}")]
    MalformedResponse(String),

    /// Any other transport failure reported by the HTTP stack.
    #[error("request failed: {0}")]
    Transport(String),

    /// Rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The HTTP client or base URL could not be set up.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl ClientError {
    /// Classify a reqwest failure for the given URL.
    ///
    /// Timeouts are checked first: a connect timeout is reported as
    /// `TimedOut`, not `Unreachable`.
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClientError::TimedOut {
                url: url.to_string(),
                timeout,
            }
        } else if err.is_connect() {
            ClientError::Unreachable {
                url: url.to_string(),
                reason: root_cause(&err),
            }
        } else if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else {
            ClientError::Transport(root_cause(&err))
        }
    }

    /// Build a `Rejected` error from a non-success status and its raw body.
    ///
    /// A JSON body contributes its `error` or `message` string when present,
    /// otherwise its compact form. Anything else is kept as trimmed text.
    pub fn rejected(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<Value>(body) {
            Ok(json) => json_error_message(&json),
            Err(_) => {
                let text = body.trim();
                if text.is_empty() {
                    status.canonical_reason().unwrap_or("no response body").to_string()
                } else {
                    text.chars().take(MAX_RAW_BODY_CHARS).collect()
                }
            }
        };
        ClientError::Rejected { status, message }
    }

    /// Short label for the error kind, used in log lines and probe output.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Unreachable { .. } => "unreachable",
            ClientError::TimedOut { .. } => "timed-out",
            ClientError::Rejected { .. } => "rejected",
            ClientError::MalformedResponse(_) => "malformed-response",
            ClientError::Transport(_) => "transport",
            ClientError::InvalidInput(_) => "invalid-input",
            ClientError::Setup(_) => "setup",
        }
    }
}

fn json_error_message(json: &Value) -> String {
    for key in ["error", "message"] {
        if let Some(msg) = json.get(key).and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    json.to_string()
}

/// The innermost error in the source chain, which is where hyper puts the
/// useful text ("Connection refused", "dns error", ...).
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
