//! Connectivity probe for troubleshooting a gateway deployment.
//!
//! Tries alternative URL shapes for the gateway, then checks the main
//! endpoints and dumps status, headers and bodies verbatim. Uses the same
//! header conventions as the resource client.

use std::io::Write;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode, Url};
use serde_json::Value;

use crate::api::credential::API_KEY_HEADER;
use crate::api::{ApiClient, ClientError, Credential};

/// Timeout used when trying candidate URL shapes.
pub const CANDIDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// How much of a candidate's body to show.
const CANDIDATE_PREVIEW_CHARS: usize = 200;

/// Endpoints checked after the candidate sweep (the collection is first).
const STATUS_ENDPOINTS: &[&str] = &["/stats", "/usage"];

const COMMON_ISSUES: &[&str] = &[
    "Edge function not deployed",
    "Incorrect API key",
    "API key expired or inactive",
    "Wrong project URL",
    "Edge function name mismatch",
];

const RULE: &str = "============================================================";

/// Result of one endpoint check.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCheck {
    pub label: String,
    pub passed: bool,
}

/// URLs worth trying when the configured base URL does not answer.
///
/// Always the collection and `/stats` under the base URL. For a hosted
/// `<ref>.supabase.co/functions/v1/<fn>` base, also the
/// `<ref>.functions.supabase.co/<fn>` form. Extra candidates are appended.
pub fn candidate_urls(base_url: &str, collection: &str, extra: &[String]) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let mut urls = vec![
        format!("{}/{}", base, collection),
        format!("{}/stats", base),
    ];

    if let Some(alt) = functions_subdomain_url(base) {
        urls.push(format!("{}/{}", alt, collection));
    }

    for url in extra {
        if !urls.contains(url) {
            urls.push(url.clone());
        }
    }
    urls
}

fn functions_subdomain_url(base: &str) -> Option<String> {
    let url = Url::parse(base).ok()?;
    let host = url.host_str()?;
    let project = host.strip_suffix(".supabase.co")?;
    if project.contains('.') {
        return None;
    }
    let function = url.path().strip_prefix("/functions/v1/")?.trim_matches('/');
    if function.is_empty() {
        return None;
    }
    Some(format!(
        "{}://{}.functions.supabase.co/{}",
        url.scheme(),
        project,
        function
    ))
}

/// A check passes only on 200 or 201.
pub fn is_pass(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

/// Run the whole probe, writing the report to `out`.
///
/// Returns `true` when every endpoint check passed.
pub async fn run<W: Write>(
    api: &ApiClient,
    credential: &Credential,
    collection: &str,
    extra_candidates: &[String],
    out: &mut W,
) -> std::io::Result<bool> {
    writeln!(out, "MSP API Debug Script")?;
    writeln!(out, "{}", RULE)?;
    if !credential.has_conventional_prefix() {
        writeln!(out, "Warning: API key doesn't start with 'msp_'")?;
    }
    writeln!(out, "\nBase URL: {}", api.base_url())?;
    writeln!(out, "API Key: {}", credential.masked())?;

    section(out, "TESTING DIFFERENT URL FORMATS")?;
    for url in candidate_urls(api.base_url(), collection, extra_candidates) {
        probe_candidate(api, &url, out).await?;
    }

    section(out, "TESTING API ENDPOINTS")?;
    let collection_path = format!("/{}", collection.trim_matches('/'));
    let mut checks = Vec::new();
    for path in std::iter::once(collection_path.as_str()).chain(STATUS_ENDPOINTS.iter().copied()) {
        let passed = check_endpoint(api, credential, path, out).await?;
        checks.push(EndpointCheck {
            label: format!("GET {}", path),
            passed,
        });
    }

    write_summary(&checks, out)?;
    Ok(checks.iter().all(|c| c.passed))
}

async fn probe_candidate<W: Write>(api: &ApiClient, url: &str, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nTrying: {}", url)?;
    match api.get_absolute(url, CANDIDATE_TIMEOUT).await {
        Ok(resp) => {
            let status = resp.status();
            writeln!(out, "  Status: {}", status.as_u16())?;
            if status != StatusCode::NOT_FOUND {
                let body = resp.text().await.unwrap_or_default();
                let preview: String = body.chars().take(CANDIDATE_PREVIEW_CHARS).collect();
                writeln!(out, "  Found! This might be the correct URL")?;
                writeln!(out, "  Response: {}", preview)?;
            }
        }
        Err(e) => writeln!(out, "  Error: {}", e)?,
    }
    Ok(())
}

async fn check_endpoint<W: Write>(
    api: &ApiClient,
    credential: &Credential,
    path: &str,
    out: &mut W,
) -> std::io::Result<bool> {
    let url = api.url(path);
    section(out, &format!("Testing: GET {}", url))?;
    writeln!(out, "API Key: {}", credential.masked())?;
    writeln!(out, "Headers: {}", masked_headers(api.headers(), credential))?;

    match api.get(path).await {
        Ok(resp) => {
            let status = resp.status();
            write_response(resp, out).await?;
            Ok(is_pass(status))
        }
        Err(e) => {
            writeln!(out, "\n{}: {}", error_heading(&e), e)?;
            writeln!(out, "{}", error_hint(&e))?;
            log::warn!("Probe of {} failed ({})", path, e.kind());
            Ok(false)
        }
    }
}

async fn write_response<W: Write>(resp: Response, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nResponse Status: {}", resp.status().as_u16())?;
    writeln!(out, "Response Headers:")?;
    for (name, value) in resp.headers() {
        writeln!(out, "  {}: {}", name, value.to_str().unwrap_or("<binary>"))?;
    }

    writeln!(out, "\nResponse Body:")?;
    match resp.text().await {
        Ok(body) => writeln!(out, "{}", format_body(&body))?,
        Err(e) => writeln!(out, "<unreadable body: {}>", e)?,
    }
    Ok(())
}

/// Pretty JSON when the body parses, raw text otherwise.
pub fn format_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or_else(|| body.to_string())
}

/// The request headers as pretty JSON with the API key masked.
fn masked_headers(headers: &HeaderMap, credential: &Credential) -> String {
    let map: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let shown = if name.as_str() == API_KEY_HEADER {
                credential.masked()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), Value::String(shown))
        })
        .collect();
    serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_default()
}

fn error_heading(err: &ClientError) -> &'static str {
    match err {
        ClientError::Unreachable { .. } => "CONNECTION ERROR",
        ClientError::TimedOut { .. } => "TIMEOUT ERROR",
        _ => "REQUEST ERROR",
    }
}

fn error_hint(err: &ClientError) -> &'static str {
    match err {
        ClientError::Unreachable { .. } => "The server might not be reachable or the URL is incorrect",
        ClientError::TimedOut { .. } => "The server took too long to respond",
        _ => "The request could not be completed",
    }
}

fn write_summary<W: Write>(checks: &[EndpointCheck], out: &mut W) -> std::io::Result<()> {
    section(out, "SUMMARY")?;
    for check in checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        writeln!(out, "{} - {}", status, check.label)?;
    }

    if checks.iter().all(|c| c.passed) {
        writeln!(out, "\nAll tests passed! Your API connection is working.")?;
    } else {
        writeln!(out, "\nSome tests failed. Please check the errors above.")?;
        writeln!(out, "\nCommon issues:")?;
        for (i, issue) in COMMON_ISSUES.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, issue)?;
        }
    }
    Ok(())
}

fn section<W: Write>(out: &mut W, title: &str) -> std::io::Result<()> {
    writeln!(out, "\n{}\n{}\n{}", RULE, title, RULE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{unreachable_base_url, Canned, TestServer};
    use crate::api::ClientOptions;

    fn credential() -> Credential {
        Credential::new("msp_test_0123456789abcdef").unwrap()
    }

    fn api(base_url: &str) -> ApiClient {
        let options = ClientOptions {
            use_system_proxy: false,
            ..ClientOptions::with_timeout(Duration::from_secs(2))
        };
        ApiClient::new(base_url, &credential(), options).unwrap()
    }

    #[test]
    fn test_candidates_for_hosted_function() {
        let urls = candidate_urls(
            "https://abcdefgh.supabase.co/functions/v1/msp-gateway/",
            "enboxes",
            &[],
        );
        assert_eq!(
            urls,
            vec![
                "https://abcdefgh.supabase.co/functions/v1/msp-gateway/enboxes",
                "https://abcdefgh.supabase.co/functions/v1/msp-gateway/stats",
                "https://abcdefgh.functions.supabase.co/msp-gateway/enboxes",
            ]
        );
    }

    #[test]
    fn test_candidates_for_local_base_and_extras() {
        let extra = vec![
            "http://localhost:54321/enboxes".to_string(),
            "http://localhost:54321/gw/stats".to_string(),
        ];
        let urls = candidate_urls("http://localhost:54321/gw", "enboxes", &extra);
        assert_eq!(
            urls,
            vec![
                "http://localhost:54321/gw/enboxes",
                "http://localhost:54321/gw/stats",
                "http://localhost:54321/enboxes",
            ]
        );
    }

    #[test]
    fn test_is_pass() {
        assert!(is_pass(StatusCode::OK));
        assert!(is_pass(StatusCode::CREATED));
        assert!(!is_pass(StatusCode::NO_CONTENT));
        assert!(!is_pass(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_format_body() {
        assert_eq!(format_body(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(format_body("plain text"), "plain text");
    }

    #[test]
    fn test_masked_headers_hide_key() {
        let api = api("http://localhost:1");
        let shown = masked_headers(api.headers(), &credential());
        assert!(shown.contains("application/json"));
        assert!(!shown.contains("msp_test_0123456789abcdef"));
        assert!(shown.contains("msp_test_012...cdef"));
    }

    #[tokio::test]
    async fn test_probe_all_passing() {
        let server = TestServer::start(vec![
            // candidates: /enboxes, /stats
            Canned::json(200, "[]"),
            Canned::json(404, r#"{"error": "not found"}"#),
            // endpoints: /enboxes, /stats, /usage
            Canned::json(200, r#"[{"id": "1"}]"#),
            Canned::json(200, r#"{"total": 1}"#),
            Canned::json(201, r#"{"calls": 7}"#),
        ])
        .await;
        let api = api(&server.base_url());

        let mut out = Vec::new();
        let passed = run(&api, &credential(), "enboxes", &[], &mut out).await.unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(passed);
        assert!(report.contains("Found! This might be the correct URL"));
        assert!(report.contains("PASS - GET /enboxes"));
        assert!(report.contains("PASS - GET /usage"));
        assert!(report.contains("All tests passed!"));
        assert!(!report.contains("msp_test_0123456789abcdef"));

        let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/enboxes", "/stats", "/enboxes", "/stats", "/usage"]);
        assert!(server
            .requests()
            .iter()
            .all(|r| r.header("x-msp-api-key") == Some("msp_test_0123456789abcdef")));
    }

    #[tokio::test]
    async fn test_probe_reports_failures_and_hints() {
        let server = TestServer::start(vec![
            Canned::json(404, "{}"),
            Canned::json(404, "{}"),
            Canned::json(401, r#"{"error": "Invalid API key"}"#),
            Canned::text(500, "boom"),
            Canned::json(200, "{}"),
        ])
        .await;
        let api = api(&server.base_url());

        let mut out = Vec::new();
        let passed = run(&api, &credential(), "enboxes", &[], &mut out).await.unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(!passed);
        assert!(report.contains("FAIL - GET /enboxes"));
        assert!(report.contains("FAIL - GET /stats"));
        assert!(report.contains("PASS - GET /usage"));
        assert!(report.contains("Invalid API key"));
        assert!(report.contains("Common issues:"));
        assert!(report.contains("5. Edge function name mismatch"));
    }

    #[tokio::test]
    async fn test_probe_unreachable_server() {
        let api = api(&unreachable_base_url().await);

        let mut out = Vec::new();
        let passed = run(&api, &credential(), "enboxes", &[], &mut out).await.unwrap();
        let report = String::from_utf8(out).unwrap();

        assert!(!passed);
        assert!(report.contains("CONNECTION ERROR"));
        assert!(report.contains("The server might not be reachable"));
    }
}
