//! HTTP client with API key header injection and bounded request time.
//!
//! All requests carry `content-type: application/json` and the
//! `x-msp-api-key` header. The header set is built once at construction and
//! reused on every call; the client keeps no other state between calls.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::Value;

use super::credential::{Credential, API_KEY_HEADER};
use super::error::ClientError;

/// Default bound on a single request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport settings for an `ApiClient`.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Total time allowed for one request.
    pub timeout: Duration,
    /// Time allowed to establish the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_TIMEOUT,
            use_system_proxy: true,
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout,
            ..Self::default()
        }
    }
}

/// HTTP client wrapper for MSP gateway communication.
///
/// Manages the base URL and the fixed header set, and converts every failure
/// into a `ClientError`.
pub struct ApiClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client for the given base URL and API key.
    pub fn new(
        base_url: &str,
        credential: &Credential,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::Setup(format!("invalid base URL '{}': {}", base_url, e)))?;

        let mut key = HeaderValue::from_str(credential.expose())
            .map_err(|_| ClientError::Setup("API key contains invalid header characters".into()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let mut builder = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout);
        if !options.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            headers,
            timeout: options.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The header set sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a GET to a relative API path and hand back the raw response.
    ///
    /// Non-success statuses are not errors here; callers that want the
    /// normalised envelope use `send_json`.
    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        let url = self.url(path);
        self.get_absolute(&url, self.timeout).await
    }

    /// Send a GET to an absolute URL with its own timeout (used by the probe
    /// to try alternative URL shapes).
    pub async fn get_absolute(&self, url: &str, timeout: Duration) -> Result<Response, ClientError> {
        log::debug!("GET {}", url);
        self.client
            .get(url)
            .headers(self.headers.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, url, timeout))
    }

    /// Send a request to a relative API path and decode the JSON response.
    ///
    /// Returns the decoded body on 2xx (`null` for an empty body) and a
    /// `ClientError` for everything else.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.url(path);
        log::debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let result = match builder.send().await {
            Ok(resp) => self.read_json(resp, &url).await,
            Err(e) => Err(self.classify(e, &url)),
        };
        if let Err(ref e) = result {
            log::warn!("{} {} failed ({}): {}", method, path, e.kind(), e);
        }
        result
    }

    async fn read_json(&self, resp: Response, url: &str) -> Result<Value, ClientError> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e, url))?;

        if !status.is_success() {
            return Err(ClientError::rejected(status, &body));
        }
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> ClientError {
        ClientError::from_reqwest(err, url, self.timeout)
    }
}
