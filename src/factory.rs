use crate::models::{
    empty_api_keys, AiVisibility, AiVisibilityComparison, AuditData, AuditInput, AuditMeta, AuditResults,
    CitationsProfile, CompetitorRank, Forecast, ForecastPoint, ForecastType, Frequency, MailNotifications,
    OpportunityGap, QuestionPerformance, RankCitations, Rating, SeoIssue, Settings, CURRENT_SCHEMA_VERSION,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const DEMO_SEED: u64 = 0x5e0_a0d1;
const HISTORY_MONTHS: usize = 6;
const TREND_MONTHS: usize = 3;
const FORECAST_MONTHS: usize = 3;
const MAX_TRACKED_QUESTIONS: usize = 5;

static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("valid scheme regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureMode {
    /// Every numeric field drawn from the thread RNG.
    #[default]
    Randomized,
    /// Fixed seed: the same input always yields the same audit numbers.
    Demo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFactory {
    mode: FixtureMode,
}

pub fn create_audit_data(input: AuditInput) -> AuditData {
    AuditFactory::default().create(input)
}

impl AuditFactory {
    pub fn new(mode: FixtureMode) -> Self {
        Self { mode }
    }

    pub fn create(&self, input: AuditInput) -> AuditData {
        let now = Utc::now();
        match self.mode {
            FixtureMode::Randomized => self.create_with(input, &mut rand::rng(), now),
            FixtureMode::Demo => self.create_with(input, &mut StdRng::seed_from_u64(DEMO_SEED), now),
        }
    }

    pub fn create_with<R: Rng>(&self, input: AuditInput, rng: &mut R, now: DateTime<Utc>) -> AuditData {
        let seo_score = rng.random_range(60..90);
        let ai_citation_score = rng.random_range(50..90);
        let critical_issues = rng.random_range(3..18);
        let traffic_trend = (0..HISTORY_MONTHS).map(|_| rng.random_range(1000..1300)).collect();

        let ai_visibility = AiVisibility {
            comparison: visibility_comparison(&input, rng),
            top_questions_performance: question_performance(&input, rng),
        };

        let current_traffic: Vec<u32> = (0..HISTORY_MONTHS).map(|_| rng.random_range(1000..1300)).collect();
        let projected_uplift: Vec<u32> = (0..TREND_MONTHS + FORECAST_MONTHS)
            .map(|i| rng.random_range(1200..1500) + (i as u32) * 50)
            .collect();
        let forecast = Forecast {
            traffic_data: traffic_data(&current_traffic, &projected_uplift, now),
            current_traffic,
            projected_uplift,
        };

        let citations_profile = CitationsProfile {
            dr: rng.random_range(20..80),
            backlinks: rng.random_range(500..20_000),
            ref_domains: rng.random_range(50..1_500),
        };

        let competitor_seo_issues: BTreeMap<String, Vec<SeoIssue>> = input
            .competitors
            .iter()
            .map(|competitor| (competitor.clone(), competitor_issue_fixtures()))
            .collect();

        let settings = default_settings(&input.website);

        AuditData {
            audit: AuditResults {
                seo_score,
                ai_citation_score,
                critical_issues,
                traffic_trend,
                opportunity_gaps: opportunity_gap_fixtures(),
                seo_issues: seo_issue_fixtures(),
                competitor_seo_issues,
                ai_visibility: Some(ai_visibility),
                quick_wins: quick_win_fixtures(),
                forecast,
                citations_profile: Some(citations_profile),
            },
            input,
            settings,
            meta: AuditMeta {
                schema_version: CURRENT_SCHEMA_VERSION,
                audit_id: Uuid::new_v4().to_string(),
                last_updated: now,
            },
        }
    }
}

pub fn default_settings(website: &str) -> Settings {
    let host = SCHEME_RE.replace(website.trim(), "");
    Settings {
        mail_notifications: MailNotifications {
            enabled: true,
            frequency: vec![Frequency::Weekly, Frequency::Monthly],
            recipients: vec![format!("admin@{}", host)],
            attach_audit_file: true,
        },
        download_option: true,
        api_keys: empty_api_keys(),
    }
}

fn visibility_comparison<R: Rng>(input: &AuditInput, rng: &mut R) -> Vec<AiVisibilityComparison> {
    let mut comparison = Vec::with_capacity(input.competitors.len() + 1);
    comparison.push(AiVisibilityComparison {
        domain: input.website.clone(),
        citations: rng.random_range(15..45),
        serp_mentions: rng.random_range(20..60),
    });
    for competitor in &input.competitors {
        comparison.push(AiVisibilityComparison {
            domain: competitor.clone(),
            citations: rng.random_range(25..75),
            serp_mentions: rng.random_range(30..90),
        });
    }
    comparison
}

fn question_performance<R: Rng>(input: &AuditInput, rng: &mut R) -> Vec<QuestionPerformance> {
    input
        .target_questions
        .iter()
        .take(MAX_TRACKED_QUESTIONS)
        .enumerate()
        .map(|(index, question)| {
            let domain = if input.competitors.is_empty() {
                String::new()
            } else {
                input.competitors[index % input.competitors.len()].clone()
            };
            QuestionPerformance {
                question: question.clone(),
                own_site: RankCitations {
                    rank: rng.random_range(3..8),
                    citations: rng.random_range(1..4),
                },
                top_competitor: CompetitorRank {
                    domain,
                    rank: rng.random_range(1..3),
                    citations: rng.random_range(3..8),
                },
            }
        })
        .collect()
}

fn traffic_data(current: &[u32], projected: &[u32], now: DateTime<Utc>) -> Vec<ForecastPoint> {
    let history_start = -(current.len() as i32 - 1);
    let historical = current.iter().enumerate().map(|(i, clicks)| ForecastPoint {
        month: month_label(now, history_start + i as i32),
        clicks: *clicks,
        kind: ForecastType::Historical,
    });
    let upcoming = projected.iter().enumerate().map(|(i, clicks)| ForecastPoint {
        month: month_label(now, i as i32 + 1),
        clicks: *clicks,
        kind: if i < TREND_MONTHS {
            ForecastType::Trend
        } else {
            ForecastType::Forecast
        },
    });
    historical.chain(upcoming).collect()
}

fn month_label(now: DateTime<Utc>, offset: i32) -> String {
    let index = now.year() * 12 + now.month0() as i32 + offset;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("M{}", offset))
}

fn issue(issue: &str, page: &str, impact: Rating, recommendation: &str) -> SeoIssue {
    SeoIssue {
        issue: issue.to_string(),
        page: page.to_string(),
        impact,
        recommendation: recommendation.to_string(),
    }
}

fn gap(issue: &str, page: &str, impact: Rating, effort: Rating, recommendation: &str, quick_win: bool) -> OpportunityGap {
    OpportunityGap {
        issue: issue.to_string(),
        page: page.to_string(),
        impact,
        effort,
        recommendation: recommendation.to_string(),
        quick_win,
    }
}

fn opportunity_gap_fixtures() -> Vec<OpportunityGap> {
    vec![
        gap(
            "Missing FAQ schema for key questions",
            "/faq",
            Rating::High,
            Rating::Low,
            "Add FAQ Structured Data for key questions",
            true,
        ),
        gap(
            "Brand does not appear in AI/LLM citations for key terms",
            "/conditions",
            Rating::High,
            Rating::Medium,
            "Optimize pages for AI visibility with targeted content and structured data",
            false,
        ),
        gap(
            "Competitors ranking for important industry keywords",
            "/treatments",
            Rating::Medium,
            Rating::Medium,
            "Add regularly updated content and optimize metadata",
            false,
        ),
    ]
}

fn seo_issue_fixtures() -> Vec<SeoIssue> {
    vec![
        issue(
            "Mobile site speed is below industry benchmark",
            "/",
            Rating::High,
            "Enable caching, optimize images, and reduce JS payload",
        ),
        issue(
            "No XML sitemap found",
            "/",
            Rating::Medium,
            "Generate and submit an XML sitemap to Google Search Console",
        ),
        issue(
            "Missing alt attributes for images",
            "/resources",
            Rating::Medium,
            "Add descriptive alt text for accessibility and SEO",
        ),
        issue(
            "Title tags are missing for some pages",
            "/subpages",
            Rating::Low,
            "Add unique, keyword-rich title tags",
        ),
    ]
}

fn competitor_issue_fixtures() -> Vec<SeoIssue> {
    vec![
        issue(
            "Several pages miss FAQ structured data",
            "/faq",
            Rating::High,
            "Add FAQ schema to top-cited pages",
        ),
        issue(
            "Large JavaScript files delay LCP",
            "/",
            Rating::High,
            "Code split and defer non-critical JS",
        ),
        issue(
            "Duplicate meta descriptions on pages",
            "/products",
            Rating::Medium,
            "Ensure all meta descriptions are unique",
        ),
    ]
}

fn quick_win_fixtures() -> Vec<String> {
    [
        "Add FAQPage schema for all key questions",
        "Submit XML sitemap and fix crawling issues",
        "Improve mobile speed by optimizing images",
        "Enhance content for top treatment questions",
        "Increase internal linking between resources",
        "Update alt attributes for all images",
        "Add rich snippets for key content",
        "Monitor AI/LLM citations monthly",
    ]
    .into_iter()
    .map(ToString::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_input(competitors: &[&str]) -> AuditInput {
        AuditInput {
            website: "example.com".to_string(),
            region: "Global".to_string(),
            audience: "Patients".to_string(),
            target_questions: (1..=10).map(|i| format!("Question {}?", i)).collect(),
            competitors: competitors.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn comparison_has_own_site_first_and_one_entry_per_competitor() {
        let record = create_audit_data(sample_input(&["a.com"]));
        let comparison = &record.audit.ai_visibility.as_ref().expect("visibility").comparison;
        assert_eq!(comparison.len(), 2);
        assert_eq!(comparison[0].domain, "example.com");
        assert_eq!(comparison[1].domain, "a.com");
    }

    #[test]
    fn numeric_fields_stay_within_ranges() {
        let factory = AuditFactory::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let record = factory.create_with(sample_input(&["a.com", "b.com", "c.com"]), &mut rng, Utc::now());
            assert!((60..90).contains(&record.audit.seo_score));
            assert!((50..90).contains(&record.audit.ai_citation_score));
            assert!((3..18).contains(&record.audit.critical_issues));
            assert!(record.audit.traffic_trend.iter().all(|v| (1000..1300).contains(v)));
            for (i, value) in record.audit.forecast.projected_uplift.iter().enumerate() {
                let floor = 1200 + 50 * i as u32;
                assert!((floor..floor + 300).contains(value));
            }
            let visibility = record.audit.ai_visibility.expect("visibility");
            assert!((15..45).contains(&visibility.comparison[0].citations));
            assert!(visibility.comparison[1..].iter().all(|c| (25..75).contains(&c.citations)));
        }
    }

    #[test]
    fn tracks_at_most_five_questions_and_cycles_competitors() {
        let record = create_audit_data(sample_input(&["a.com", "b.com"]));
        let performance = record.audit.ai_visibility.expect("visibility").top_questions_performance;
        assert_eq!(performance.len(), 5);
        assert_eq!(performance[0].question, "Question 1?");
        assert_eq!(performance[2].top_competitor.domain, "a.com");
        assert_eq!(performance[3].top_competitor.domain, "b.com");
    }

    #[test]
    fn empty_competitor_list_does_not_panic() {
        let record = create_audit_data(sample_input(&[]));
        let visibility = record.audit.ai_visibility.expect("visibility");
        assert_eq!(visibility.comparison.len(), 1);
        assert!(visibility.top_questions_performance.iter().all(|q| q.top_competitor.domain.is_empty()));
    }

    #[test]
    fn demo_mode_repeats_the_same_numbers() {
        let factory = AuditFactory::new(FixtureMode::Demo);
        let first = factory.create(sample_input(&["a.com"]));
        let second = factory.create(sample_input(&["a.com"]));
        assert_eq!(first.audit.seo_score, second.audit.seo_score);
        assert_eq!(first.audit.ai_visibility, second.audit.ai_visibility);
        assert_eq!(first.audit.forecast.current_traffic, second.audit.forecast.current_traffic);
        assert_ne!(first.meta.audit_id, second.meta.audit_id);
    }

    #[test]
    fn traffic_data_spans_history_trend_and_forecast_months() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();
        let record = AuditFactory::default().create_with(sample_input(&["a.com"]), &mut StdRng::seed_from_u64(1), now);
        let points = &record.audit.forecast.traffic_data;
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].month, "Sep 2025");
        assert_eq!(points[5].month, "Feb 2026");
        assert_eq!(points[5].kind, ForecastType::Historical);
        assert_eq!(points[6].month, "Mar 2026");
        assert_eq!(points[6].kind, ForecastType::Trend);
        assert_eq!(points[9].kind, ForecastType::Forecast);
        assert_eq!(points[11].month, "Aug 2026");
        assert_eq!(points[0].clicks, record.audit.forecast.current_traffic[0]);
        assert_eq!(points[6].clicks, record.audit.forecast.projected_uplift[0]);
    }

    #[test]
    fn default_recipient_strips_scheme() {
        let settings = default_settings("https://www.example.com");
        assert_eq!(settings.mail_notifications.recipients, vec!["admin@www.example.com".to_string()]);
        assert!(settings.download_option);
        assert!(settings.api_keys.values().all(String::is_empty));
    }

    #[test]
    fn competitor_issue_lists_are_keyed_by_competitor() {
        let record = create_audit_data(sample_input(&["a.com", "b.com"]));
        assert_eq!(record.audit.competitor_seo_issues.len(), 2);
        assert_eq!(record.audit.competitor_seo_issues["b.com"].len(), 3);
        assert_eq!(record.meta.schema_version, CURRENT_SCHEMA_VERSION);
    }
}
