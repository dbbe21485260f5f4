use crate::errors::{AppError, AppResult};
use crate::models::{AuditForm, AuditInput, Frequency, MailNotifications, NotificationRequest};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_TARGET_QUESTIONS: usize = 10;
pub const MIN_COMPETITORS: usize = 1;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn validate_audit_form(form: &AuditForm) -> AppResult<AuditInput> {
    let website = form.website.trim();
    let region = form.region.trim();
    let audience = form.audience.trim();
    if website.is_empty() || region.is_empty() || audience.is_empty() {
        return Err(AppError::Validation("Please fill in all required fields".to_string()));
    }

    let target_questions = non_blank(&form.target_questions);
    if target_questions.len() < MIN_TARGET_QUESTIONS {
        return Err(AppError::Validation(format!(
            "Please provide at least {} target questions (got {})",
            MIN_TARGET_QUESTIONS,
            target_questions.len()
        )));
    }

    let competitors = non_blank(&form.competitors);
    if competitors.len() < MIN_COMPETITORS {
        return Err(AppError::Validation("Please add at least one competitor".to_string()));
    }

    Ok(AuditInput {
        website: website.to_string(),
        region: region.to_string(),
        audience: audience.to_string(),
        target_questions,
        competitors,
    })
}

pub fn validate_notification_settings(request: &NotificationRequest) -> AppResult<MailNotifications> {
    let email = request.email.trim();
    if request.enabled && email.is_empty() {
        return Err(AppError::Validation("Please enter an email address".to_string()));
    }
    if request.enabled && !request.weekly && !request.monthly {
        return Err(AppError::Validation(
            "Please select at least one notification frequency".to_string(),
        ));
    }
    if !email.is_empty() && !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation(format!("Invalid email address: {}", email)));
    }

    let mut frequency = Vec::new();
    if request.weekly {
        frequency.push(Frequency::Weekly);
    }
    if request.monthly {
        frequency.push(Frequency::Monthly);
    }

    Ok(MailNotifications {
        enabled: request.enabled,
        frequency,
        recipients: if email.is_empty() { Vec::new() } else { vec![email.to_string()] },
        attach_audit_file: request.attach_report,
    })
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}
