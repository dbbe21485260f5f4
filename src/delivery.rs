use crate::errors::{AppError, AppResult};
use crate::models::{AuditData, DeliveredReport, ReportFormat};
use crate::redaction::Redactor;
use crate::report::{to_delimited_text, to_plain_text};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const REPORT_ENDPOINT_PATH: &str = "/functions/v1/generate-report";

static CONTENT_DISPOSITION_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="?([^";]+)"?"#).expect("valid content-disposition regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

pub fn report_filename(format: ReportFormat, timestamp_ms: i64) -> String {
    format!("ai-seo-audit-{}.{}", timestamp_ms, format.extension())
}

/// Single rendering entry point shared by local export and the HTTP endpoint.
pub fn render_report(format: ReportFormat, record: &AuditData, timestamp_ms: i64) -> RenderedReport {
    let body = match format {
        ReportFormat::Excel => to_delimited_text(record),
        ReportFormat::Pdf => to_plain_text(record),
    };
    RenderedReport {
        filename: report_filename(format, timestamp_ms),
        content_type: format.content_type(),
        body,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequestBody<'a> {
    format: ReportFormat,
    audit_data: &'a AuditData,
}

#[derive(Debug, Clone)]
pub struct LocalDelivery {
    export_dir: PathBuf,
}

impl LocalDelivery {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn deliver(&self, format: ReportFormat, record: &AuditData) -> AppResult<DeliveredReport> {
        let rendered = render_report(format, record, Utc::now().timestamp_millis());
        write_export(&self.export_dir, &rendered.filename, rendered.body.as_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct RemoteDelivery {
    endpoint: String,
    api_key: Option<String>,
    export_dir: PathBuf,
    client: reqwest::Client,
}

impl RemoteDelivery {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            export_dir: export_dir.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn deliver(&self, format: ReportFormat, record: &AuditData) -> AppResult<DeliveredReport> {
        let (filename, bytes) = self.fetch(format, record).await?;
        write_export(&self.export_dir, &filename, &bytes)
    }

    /// Posts the record and returns the attachment filename and body.
    pub async fn fetch(&self, format: ReportFormat, record: &AuditData) -> AppResult<(String, Vec<u8>)> {
        let mut request = self.client.post(&self.endpoint).json(&ReportRequestBody {
            format,
            audit_data: record,
        });
        if let Some(api_key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Delivery(format!(
                "HTTP error! status: {} {}",
                status.as_u16(),
                detail.trim()
            )));
        }

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| report_filename(format, Utc::now().timestamp_millis()));
        let bytes = response.bytes().await?.to_vec();
        Ok((filename, bytes))
    }
}

#[derive(Debug, Clone)]
pub enum ReportDelivery {
    Local(LocalDelivery),
    Remote(RemoteDelivery),
}

impl ReportDelivery {
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }

    /// Any failure collapses into one user-facing message naming the format.
    pub async fn deliver(&self, format: ReportFormat, record: &AuditData) -> AppResult<DeliveredReport> {
        let outcome = match self {
            Self::Local(local) => local.deliver(format, record),
            Self::Remote(remote) => remote.deliver(format, record).await,
        };

        match outcome {
            Ok(delivered) => {
                tracing::info!(
                    strategy = self.strategy(),
                    format = format.as_str(),
                    path = %delivered.path,
                    bytes = delivered.bytes,
                    "report delivered"
                );
                Ok(delivered)
            }
            Err(error) => {
                let detail = Redactor::new().redact(&error.to_string()).content;
                tracing::error!(strategy = self.strategy(), format = format.as_str(), error = %detail, "download error");
                Err(AppError::Delivery(format!("Failed to download {} report", format.label())))
            }
        }
    }
}

pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    CONTENT_DISPOSITION_FILENAME
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

fn write_export(export_dir: &Path, filename: &str, bytes: &[u8]) -> AppResult<DeliveredReport> {
    std::fs::create_dir_all(export_dir).map_err(|error| AppError::Io(error.to_string()))?;

    let safe_name = sanitize_filename(filename);
    let output_path = export_dir.join(&safe_name);
    if !output_path.starts_with(export_dir) {
        return Err(AppError::Io("Resolved export path escaped export directory".to_string()));
    }

    std::fs::write(&output_path, bytes).map_err(|error| AppError::Io(error.to_string()))?;
    Ok(DeliveredReport {
        path: output_path.to_string_lossy().to_string(),
        filename: safe_name,
        bytes: bytes.len(),
    })
}

fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let candidate: String = out.trim_matches(|c: char| c == '_' || c == '.').chars().take(120).collect();
    if candidate.is_empty() {
        "report".to_string()
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::create_audit_data;
    use crate::models::AuditInput;

    fn sample_record() -> AuditData {
        create_audit_data(AuditInput {
            website: "example.com".to_string(),
            region: "Global".to_string(),
            audience: "Patients".to_string(),
            target_questions: (1..=10).map(|i| format!("Question {}?", i)).collect(),
            competitors: vec!["a.com".to_string()],
        })
    }

    #[test]
    fn render_selects_body_and_metadata_by_format() {
        let record = sample_record();
        let csv = render_report(ReportFormat::Excel, &record, 1_700_000_000_000);
        assert_eq!(csv.filename, "ai-seo-audit-1700000000000.csv");
        assert_eq!(csv.content_type, "text/csv");
        assert_eq!(csv.body, to_delimited_text(&record));

        let text = render_report(ReportFormat::Pdf, &record, 42);
        assert_eq!(text.filename, "ai-seo-audit-42.txt");
        assert_eq!(text.content_type, "text/plain");
        assert_eq!(text.body, to_plain_text(&record));
    }

    #[test]
    fn parses_attachment_filename() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"ai-seo-audit-1.csv\""),
            Some("ai-seo-audit-1.csv".to_string())
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=report.txt"),
            Some("report.txt".to_string())
        );
        assert_eq!(filename_from_content_disposition("inline"), None);
    }

    #[test]
    fn sanitize_keeps_names_inside_export_dir() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("ai-seo-audit-1.csv"), "ai-seo-audit-1.csv");
        assert_eq!(sanitize_filename("..."), "report");
    }

    #[tokio::test]
    async fn local_delivery_writes_rendered_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let record = sample_record();
        let delivery = ReportDelivery::Local(LocalDelivery::new(dir.path().join("exports")));

        let delivered = delivery.deliver(ReportFormat::Pdf, &record).await.expect("deliver");
        assert!(delivered.filename.starts_with("ai-seo-audit-"));
        assert!(delivered.filename.ends_with(".txt"));
        let written = std::fs::read_to_string(&delivered.path).expect("read export");
        assert_eq!(written, to_plain_text(&record));
        assert_eq!(delivered.bytes, written.len());
    }

    #[tokio::test]
    async fn remote_failure_names_the_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let delivery = ReportDelivery::Remote(RemoteDelivery::new(
            "http://127.0.0.1:9/functions/v1/generate-report",
            None,
            dir.path(),
        ));
        let error = delivery
            .deliver(ReportFormat::Excel, &sample_record())
            .await
            .expect_err("nothing listens on the discard port");
        assert_eq!(error.to_string(), "DELIVERY: Failed to download EXCEL report");
    }
}
