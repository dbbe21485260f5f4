use crate::db::KeyValueStore;
use crate::errors::AppResult;
use crate::migration::upgrade_record;
use crate::models::{AuditData, SettingsPatch};
use chrono::Utc;
use std::sync::Arc;

pub const DEFAULT_STORAGE_KEY: &str = "aiseo_audit_data";

/// Append-only audit history kept as one JSON array in a single storage slot.
///
/// Every public operation swallows storage and parse failures: they are logged
/// and the call degrades to `None`, an empty history, or a no-op.
#[derive(Clone)]
pub struct AuditStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl AuditStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn save(&self, record: &AuditData) {
        if let Err(error) = self.try_save(record) {
            tracing::error!(error = %error, audit_id = %record.meta.audit_id, "failed to save audit data");
        }
    }

    pub fn get_latest(&self) -> Option<AuditData> {
        match self.try_history() {
            Ok(mut history) => history.pop(),
            Err(error) => {
                tracing::error!(error = %error, "failed to retrieve audit data");
                None
            }
        }
    }

    pub fn get_history(&self) -> Vec<AuditData> {
        self.try_history().unwrap_or_else(|error| {
            tracing::error!(error = %error, "failed to retrieve audit history");
            Vec::new()
        })
    }

    pub fn clear(&self) {
        if let Err(error) = self.kv.remove_item(&self.key) {
            tracing::error!(error = %error, "failed to clear audit data");
        }
    }

    /// Appends a new revision of the latest record carrying the patched settings.
    /// The revision keeps the original `auditId`.
    pub fn update_settings(&self, patch: SettingsPatch) -> Option<AuditData> {
        let Some(latest) = self.get_latest() else {
            tracing::warn!("settings update ignored: no audit data saved");
            return None;
        };

        let mut next = latest;
        next.settings = next.settings.merged(patch);
        next.meta.last_updated = Utc::now();

        match self.try_save(&next) {
            Ok(()) => Some(next),
            Err(error) => {
                tracing::error!(error = %error, audit_id = %next.meta.audit_id, "failed to save updated settings");
                None
            }
        }
    }

    fn try_save(&self, record: &AuditData) -> AppResult<()> {
        let mut slot = self.read_slot()?;
        if let Some(corrupt) = slot.corrupt.take() {
            let backup_key = self.backup_key();
            tracing::warn!(key = %self.key, backup_key = %backup_key, "overwriting corrupt audit history");
            self.kv.set_item(&backup_key, &corrupt)?;
        }
        slot.raw.push(serde_json::to_value(record)?);
        self.write_raw(&slot.raw)
    }

    fn try_history(&self) -> AppResult<Vec<AuditData>> {
        self.read_slot().map(|slot| slot.records)
    }

    /// Where the unparseable contents of the slot are kept before the next save replaces them.
    pub fn backup_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }

    /// Records that cannot be read stay in the slot untouched; migrated ones
    /// are written back in their upgraded form. A slot that is not a JSON
    /// array reads as empty history.
    fn read_slot(&self) -> AppResult<Slot> {
        let Some(raw) = self.kv.get_item(&self.key)? else {
            return Ok(Slot::default());
        };

        let stored: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(key = %self.key, error = %error, "corrupt audit history, reading as empty");
                return Ok(Slot {
                    corrupt: Some(raw),
                    ..Slot::default()
                });
            }
        };

        let mut slot = Slot::default();
        let mut migrated = false;
        for (index, value) in stored.into_iter().enumerate() {
            match upgrade_record(value.clone()) {
                Ok(upgraded) => {
                    if upgraded.was_migrated() {
                        tracing::info!(
                            index,
                            from_version = upgraded.from_version,
                            audit_id = %upgraded.record.meta.audit_id,
                            "migrated stored audit record"
                        );
                        migrated = true;
                        slot.raw.push(serde_json::to_value(&upgraded.record)?);
                    } else {
                        slot.raw.push(value);
                    }
                    slot.records.push(upgraded.record);
                }
                Err(error) => {
                    tracing::warn!(index, error = %error, "skipping unreadable audit record");
                    slot.raw.push(value);
                }
            }
        }

        if migrated {
            if let Err(error) = self.write_raw(&slot.raw) {
                tracing::warn!(key = %self.key, error = %error, "failed to write back migrated audit records");
            }
        }
        Ok(slot)
    }

    fn write_raw(&self, raw: &[serde_json::Value]) -> AppResult<()> {
        let serialized = serde_json::to_string(raw)?;
        self.kv.set_item(&self.key, &serialized)
    }
}

#[derive(Default)]
struct Slot {
    raw: Vec<serde_json::Value>,
    records: Vec<AuditData>,
    corrupt: Option<String>,
}
