//! Loopback HTTP stub for exercising the client in tests.
//!
//! Serves one canned response per connection, in order, and records every
//! request it sees. Responses carry `connection: close` so each request
//! arrives on a fresh connection.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A response the stub will send.
#[derive(Debug, Clone)]
pub enum Canned {
    Reply {
        status: u16,
        content_type: Option<&'static str>,
        body: String,
    },
    /// Accept the connection, read the request, then never answer.
    Stall(Duration),
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Canned::Reply {
            status,
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Canned::Reply {
            status,
            content_type: Some("text/plain"),
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Canned::Reply {
            status,
            content_type: None,
            body: String::new(),
        }
    }
}

/// A request as seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Process-wide logger that keeps every record for later inspection.
struct CapturingLogger {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();

fn logger() -> &'static CapturingLogger {
    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
            records: Mutex::new(Vec::new()),
        }));
        // Only fails if another logger won the race, in which case nothing
        // will be captured and the asserting test reports it.
        let _ = log::set_logger(logger);
        log::set_max_level(log::LevelFilter::Trace);
        logger
    })
}

/// Install the capturing logger (once) and return everything logged so far.
///
/// Tests run in parallel, so callers should filter on something unique to
/// their own request.
pub fn captured_logs() -> Vec<(log::Level, String)> {
    logger().records.lock().unwrap().clone()
}

/// Install the capturing logger before a test starts logging.
pub fn capture_logs() {
    logger();
}

pub struct TestServer {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub async fn start(responses: Vec<Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            for canned in responses {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let recorded = Arc::clone(&recorded);
                tokio::spawn(serve_one(stream, canned, recorded));
            }
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// A base URL on which nothing is listening.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn serve_one(
    mut stream: TcpStream,
    canned: Canned,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    if let Some(request) = read_request(&mut stream).await {
        recorded.lock().unwrap().push(request);
    }

    match canned {
        Canned::Stall(duration) => {
            tokio::time::sleep(duration).await;
        }
        Canned::Reply {
            status,
            content_type,
            body,
        } => {
            let mut head = format!(
                "HTTP/1.1 {} {}\r\ncontent-length: {}\r\nconnection: close\r\n",
                status,
                reason(status),
                body.len()
            );
            if let Some(ct) = content_type {
                head.push_str(&format!("content-type: {}\r\n", ct));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(body.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}
