use crate::delivery::{render_report, REPORT_ENDPOINT_PATH};
use crate::errors::{AppError, AppResult};
use crate::migration::upgrade;
use crate::models::ReportFormat;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

const MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "authorization, x-client-info, apikey, content-type"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReportRequest {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    audit_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HandlerResponse {
    fn new(status: u16, body: Vec<u8>) -> Self {
        let headers = CORS_HEADERS
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self { status, headers, body }
    }

    fn json_error(status: u16, message: &str) -> Self {
        let body = json!({ "error": message }).to_string().into_bytes();
        Self::new(status, body).with_header("Content-Type", "application/json")
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Routes one request. Pure apart from logging, so tests drive it directly.
pub fn handle_request(method: &str, url: &str, body: &[u8], timestamp_ms: i64) -> HandlerResponse {
    let path = url.split('?').next().unwrap_or_default();
    if path != REPORT_ENDPOINT_PATH {
        return HandlerResponse::json_error(404, "Not found");
    }

    match method.to_ascii_uppercase().as_str() {
        "OPTIONS" => HandlerResponse::new(200, Vec::new()),
        "POST" => match generate_report(body, timestamp_ms) {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(error = %error, "error generating report");
                HandlerResponse::json_error(500, "Failed to generate report")
            }
        },
        _ => HandlerResponse::json_error(405, "Method not allowed"),
    }
}

fn generate_report(body: &[u8], timestamp_ms: i64) -> AppResult<HandlerResponse> {
    let request: GenerateReportRequest = serde_json::from_slice(body)?;
    let Some(audit_data) = request.audit_data.filter(|value| !value.is_null()) else {
        return Ok(HandlerResponse::json_error(400, "Audit data is required"));
    };

    let format = request
        .format
        .as_deref()
        .map(ReportFormat::from_selector)
        .unwrap_or_default();
    let record = upgrade(audit_data)?;
    let rendered = render_report(format, &record, timestamp_ms);
    let bytes = rendered.body.into_bytes();
    let length = bytes.len();

    tracing::info!(
        format = format.as_str(),
        audit_id = %record.meta.audit_id,
        bytes = length,
        "generated report"
    );

    Ok(HandlerResponse::new(200, bytes)
        .with_header("Content-Type", rendered.content_type)
        .with_header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", rendered.filename),
        )
        .with_header("Content-Length", length.to_string()))
}

pub struct ReportServer {
    server: Arc<tiny_http::Server>,
}

#[derive(Clone)]
pub struct ReportServerHandle {
    server: Arc<tiny_http::Server>,
}

impl ReportServerHandle {
    pub fn shutdown(&self) {
        self.server.unblock();
    }
}

impl ReportServer {
    pub fn bind(addr: &str) -> AppResult<Self> {
        let server = tiny_http::Server::http(addr)
            .map_err(|error| AppError::Io(format!("failed to bind {}: {}", addr, error)))?;
        Ok(Self {
            server: Arc::new(server),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn handle(&self) -> ReportServerHandle {
        ReportServerHandle {
            server: Arc::clone(&self.server),
        }
    }

    /// Blocks until [`ReportServerHandle::shutdown`] is called.
    pub fn serve(self) {
        tracing::info!(addr = ?self.local_addr(), path = REPORT_ENDPOINT_PATH, "report server listening");
        for mut request in self.server.incoming_requests() {
            let method = request.method().to_string();
            let url = request.url().to_string();

            let mut body = Vec::new();
            if let Err(error) = request.as_reader().take(MAX_BODY_BYTES).read_to_end(&mut body) {
                tracing::warn!(error = %error, url = %url, "failed to read request body");
                body.clear();
            }

            let response = handle_request(&method, &url, &body, Utc::now().timestamp_millis());
            tracing::debug!(method = %method, url = %url, status = response.status, "report request");
            if let Err(error) = request.respond(to_tiny_response(response)) {
                tracing::warn!(error = %error, url = %url, "failed to write response");
            }
        }
        tracing::info!("report server stopped");
    }

    pub fn spawn(self) -> (ReportServerHandle, JoinHandle<()>) {
        let handle = self.handle();
        let join = std::thread::spawn(move || self.serve());
        (handle, join)
    }
}

fn to_tiny_response(response: HandlerResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut tiny = tiny_http::Response::from_data(response.body).with_status_code(response.status);
    for (name, value) in &response.headers {
        // tiny_http computes its own length header from the body.
        if name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        if let Ok(header) = tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            tiny.add_header(header);
        }
    }
    tiny
}
