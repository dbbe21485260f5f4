use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInput {
    pub website: String,
    pub region: String,
    pub audience: String,
    pub target_questions: Vec<String>,
    pub competitors: Vec<String>,
}

/// Shared three-step scale used for both issue impact and fix effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoIssue {
    pub issue: String,
    pub page: String,
    pub impact: Rating,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityGap {
    pub issue: String,
    pub page: String,
    pub impact: Rating,
    pub effort: Rating,
    pub recommendation: String,
    pub quick_win: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiVisibilityComparison {
    pub domain: String,
    pub citations: u32,
    #[serde(rename = "SERP_mentions")]
    pub serp_mentions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankCitations {
    pub rank: u32,
    pub citations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRank {
    pub domain: String,
    pub rank: u32,
    pub citations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPerformance {
    pub question: String,
    pub own_site: RankCitations,
    pub top_competitor: CompetitorRank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiVisibility {
    pub comparison: Vec<AiVisibilityComparison>,
    #[serde(default)]
    pub top_questions_performance: Vec<QuestionPerformance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationsProfile {
    pub dr: u32,
    pub backlinks: u64,
    pub ref_domains: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastType {
    Historical,
    Trend,
    Forecast,
}

impl ForecastType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Trend => "trend",
            Self::Forecast => "forecast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub month: String,
    pub clicks: u32,
    #[serde(rename = "type")]
    pub kind: ForecastType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub traffic_data: Vec<ForecastPoint>,
    /// Older chart format, kept alongside `traffic_data`.
    #[serde(default)]
    pub current_traffic: Vec<u32>,
    #[serde(default)]
    pub projected_uplift: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResults {
    pub seo_score: u32,
    pub ai_citation_score: u32,
    pub critical_issues: u32,
    #[serde(default)]
    pub traffic_trend: Vec<u32>,
    #[serde(default)]
    pub opportunity_gaps: Vec<OpportunityGap>,
    pub seo_issues: Vec<SeoIssue>,
    #[serde(default)]
    pub competitor_seo_issues: BTreeMap<String, Vec<SeoIssue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_visibility: Option<AiVisibility>,
    pub quick_wins: Vec<String>,
    pub forecast: Forecast,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations_profile: Option<CitationsProfile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailNotifications {
    pub enabled: bool,
    pub frequency: Vec<Frequency>,
    pub recipients: Vec<String>,
    pub attach_audit_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub mail_notifications: MailNotifications,
    pub download_option: bool,
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
}

/// Partial settings update. Present fields replace the stored value wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail_notifications: Option<MailNotifications>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_option: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_keys: Option<BTreeMap<String, String>>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.mail_notifications.is_none() && self.download_option.is_none() && self.api_keys.is_none()
    }
}

impl Settings {
    pub fn merged(&self, patch: SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(mail_notifications) = patch.mail_notifications {
            next.mail_notifications = mail_notifications;
        }
        if let Some(download_option) = patch.download_option {
            next.download_option = download_option;
        }
        if let Some(api_keys) = patch.api_keys {
            next.api_keys = api_keys;
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMeta {
    pub schema_version: u32,
    /// Stable across every settings revision appended for the same audit.
    pub audit_id: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditData {
    pub input: AuditInput,
    pub audit: AuditResults,
    pub settings: Settings,
    pub meta: AuditMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma-separated export, opened by spreadsheet tools.
    #[default]
    Excel,
    /// Plain-text export.
    Pdf,
}

impl ReportFormat {
    /// Anything other than `pdf` selects the delimited export.
    pub fn from_selector(selector: &str) -> Self {
        if selector.trim().eq_ignore_ascii_case("pdf") {
            Self::Pdf
        } else {
            Self::Excel
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Pdf => "pdf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excel => "EXCEL",
            Self::Pdf => "PDF",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Excel => "csv",
            Self::Pdf => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Excel => "text/csv",
            Self::Pdf => "text/plain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiService {
    pub key: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

pub const KNOWN_API_SERVICES: [ApiService; 6] = [
    ApiService {
        key: "awsBedrock",
        name: "AWS Bedrock API",
        category: "AI Services",
    },
    ApiService {
        key: "gscApi",
        name: "Google Search Console API",
        category: "Google Services",
    },
    ApiService {
        key: "ga4Api",
        name: "Google Analytics 4 API",
        category: "Google Services",
    },
    ApiService {
        key: "webscrapingApi",
        name: "Web Scraping API",
        category: "Data Collection",
    },
    ApiService {
        key: "semrushApi",
        name: "SEMrush API",
        category: "SEO Tools",
    },
    ApiService {
        key: "ahrefsApi",
        name: "Ahrefs API",
        category: "SEO Tools",
    },
];

pub fn empty_api_keys() -> BTreeMap<String, String> {
    KNOWN_API_SERVICES
        .iter()
        .map(|service| (service.key.to_string(), String::new()))
        .collect()
}

/// Raw intake form contents before blank entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditForm {
    pub website: String,
    pub region: String,
    pub audience: String,
    pub target_questions: Vec<String>,
    pub competitors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub enabled: bool,
    pub email: String,
    pub weekly: bool,
    pub monthly: bool,
    pub attach_report: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredReport {
    pub path: String,
    pub filename: String,
    pub bytes: usize,
}
