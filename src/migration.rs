use crate::errors::{AppError, AppResult};
use crate::models::{empty_api_keys, AuditData, CURRENT_SCHEMA_VERSION};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Outcome of reading one stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct Upgraded {
    pub record: AuditData,
    pub from_version: u32,
}

impl Upgraded {
    pub fn was_migrated(&self) -> bool {
        self.from_version != CURRENT_SCHEMA_VERSION
    }
}

pub fn upgrade(old_record: Value) -> AppResult<AuditData> {
    upgrade_record(old_record).map(|upgraded| upgraded.record)
}

pub fn upgrade_record(mut record: Value) -> AppResult<Upgraded> {
    let from_version = detect_version(&record)?;
    if from_version > CURRENT_SCHEMA_VERSION {
        return Err(AppError::Validation(format!(
            "Audit record schema version {} is newer than supported version {}",
            from_version, CURRENT_SCHEMA_VERSION
        )));
    }

    if from_version < 2 {
        upgrade_v1_to_v2(&mut record)?;
    }

    let record: AuditData = serde_json::from_value(record)?;
    Ok(Upgraded { record, from_version })
}

fn detect_version(record: &Value) -> AppResult<u32> {
    if !record.is_object() {
        return Err(AppError::Validation("Audit record must be a JSON object".to_string()));
    }
    match record.pointer("/meta/schemaVersion") {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| AppError::Validation(format!("Invalid schemaVersion {}", number))),
        Some(other) => Err(AppError::Validation(format!("Invalid schemaVersion {}", other))),
        None => Ok(1),
    }
}

fn upgrade_v1_to_v2(record: &mut Value) -> AppResult<()> {
    if let Some(settings) = record.get_mut("settings").and_then(Value::as_object_mut) {
        let placeholders = settings.remove("apiPlaceholders");
        if !settings.contains_key("apiKeys") {
            settings.insert("apiKeys".to_string(), api_keys_from_placeholders(placeholders.as_ref()));
        }
    }

    if let Some(audit) = record.get_mut("audit").and_then(Value::as_object_mut) {
        if let Some(performance) = audit
            .get_mut("aiVisibility")
            .and_then(|visibility| visibility.get_mut("topQuestionsPerformance"))
            .and_then(Value::as_array_mut)
        {
            for entry in performance.iter_mut().filter_map(Value::as_object_mut) {
                if let Some(own) = entry.remove("rnaiscience") {
                    entry.entry("ownSite").or_insert(own);
                }
            }
        }

        let forecast = audit
            .entry("forecast")
            .or_insert_with(|| json!({}));
        if let Some(forecast) = forecast.as_object_mut() {
            if !forecast.contains_key("trafficData") {
                let traffic_data = traffic_data_from_series(forecast);
                forecast.insert("trafficData".to_string(), traffic_data);
            }
        }
    }

    let meta = record
        .as_object_mut()
        .ok_or_else(|| AppError::Validation("Audit record must be a JSON object".to_string()))?
        .entry("meta")
        .or_insert_with(|| json!({}));
    let meta = meta
        .as_object_mut()
        .ok_or_else(|| AppError::Validation("Audit record meta must be an object".to_string()))?;
    meta.entry("auditId")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    meta.insert("schemaVersion".to_string(), json!(CURRENT_SCHEMA_VERSION));
    Ok(())
}

fn api_keys_from_placeholders(placeholders: Option<&Value>) -> Value {
    let mut keys = empty_api_keys();
    if let Some(placeholders) = placeholders {
        if let Some(bedrock) = placeholders.get("awsBedrock").and_then(Value::as_str) {
            keys.insert("awsBedrock".to_string(), real_value(bedrock));
        }
        for other in placeholders
            .get("otherAPIs")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            let upper = other.to_ascii_uppercase();
            let key = if upper.contains("GA4") {
                "ga4Api"
            } else if upper.contains("GSC") {
                "gscApi"
            } else {
                continue;
            };
            keys.insert(key.to_string(), real_value(other));
        }
    }
    serde_json::to_value(keys).unwrap_or_else(|_| json!({}))
}

/// `<..._PLACEHOLDER>` markers were never real keys.
fn real_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn traffic_data_from_series(forecast: &Map<String, Value>) -> Value {
    let series = |name: &str| -> Vec<u64> {
        forecast
            .get(name)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default()
    };
    let current = series("currentTraffic");
    let projected = series("projectedUplift");

    let points = current
        .iter()
        .map(|clicks| (*clicks, "historical"))
        .chain(projected.iter().map(|clicks| (*clicks, "forecast")))
        .enumerate()
        .map(|(index, (clicks, kind))| {
            json!({
                "month": format!("M{}", index + 1),
                "clicks": clicks,
                "type": kind,
            })
        })
        .collect();
    Value::Array(points)
}
