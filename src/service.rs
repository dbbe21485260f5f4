use crate::config::{AppConfig, DeliveryMode, StorageBackend};
use crate::db::{Database, KeyValueStore, MemoryStore};
use crate::delivery::{LocalDelivery, RemoteDelivery, ReportDelivery};
use crate::errors::{AppError, AppResult};
use crate::factory::AuditFactory;
use crate::models::{AuditData, AuditForm, DeliveredReport, NotificationRequest, ReportFormat, SettingsPatch};
use crate::store::AuditStore;
use crate::validation::{validate_audit_form, validate_notification_settings};
use std::sync::Arc;

/// The operations the intake, results and settings screens call.
#[derive(Clone)]
pub struct AuditService {
    store: AuditStore,
    factory: AuditFactory,
    delivery: Arc<ReportDelivery>,
}

impl AuditService {
    pub fn new(store: AuditStore, factory: AuditFactory, delivery: ReportDelivery) -> Self {
        Self {
            store,
            factory,
            delivery: Arc::new(delivery),
        }
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let kv: Arc<dyn KeyValueStore> = match config.storage {
            StorageBackend::Sqlite => Arc::new(Database::new(&config.database_path())?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        let delivery = match config.delivery {
            DeliveryMode::Local => ReportDelivery::Local(LocalDelivery::new(config.export_dir())),
            DeliveryMode::Remote => {
                let endpoint = config.report_endpoint.clone().ok_or_else(|| {
                    AppError::Validation("reportEndpoint is required when delivery is remote".to_string())
                })?;
                ReportDelivery::Remote(RemoteDelivery::new(endpoint, config.api_key.clone(), config.export_dir()))
            }
        };

        tracing::info!(
            storage = ?config.storage,
            delivery = delivery.strategy(),
            fixture_mode = ?config.fixture_mode,
            "audit service ready"
        );

        Ok(Self::new(
            AuditStore::with_key(kv, config.storage_key.clone()),
            AuditFactory::new(config.fixture_mode),
            delivery,
        ))
    }

    pub fn submit_audit(&self, form: AuditForm) -> AppResult<AuditData> {
        let input = validate_audit_form(&form)?;
        let record = self.factory.create(input);
        self.store.save(&record);
        tracing::info!(
            audit_id = %record.meta.audit_id,
            website = %record.input.website,
            questions = record.input.target_questions.len(),
            competitors = record.input.competitors.len(),
            "audit created"
        );
        Ok(record)
    }

    pub fn latest_audit(&self) -> Option<AuditData> {
        self.store.get_latest()
    }

    pub fn audit_history(&self) -> Vec<AuditData> {
        self.store.get_history()
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> AppResult<AuditData> {
        if patch.is_empty() {
            return Err(AppError::Validation("No settings changes provided".to_string()));
        }
        self.store
            .update_settings(patch)
            .ok_or_else(|| AppError::NotFound("No audit data to update".to_string()))
    }

    pub fn update_notifications(&self, request: NotificationRequest) -> AppResult<AuditData> {
        let mail_notifications = validate_notification_settings(&request)?;
        self.update_settings(SettingsPatch {
            mail_notifications: Some(mail_notifications),
            ..SettingsPatch::default()
        })
    }

    pub fn clear_history(&self) {
        self.store.clear();
    }

    pub async fn download_report(&self, format: ReportFormat) -> AppResult<DeliveredReport> {
        let record = self
            .store
            .get_latest()
            .ok_or_else(|| AppError::NotFound("No audit data available".to_string()))?;
        if !record.settings.download_option {
            return Err(AppError::Disabled("Report downloads are turned off in settings".to_string()));
        }
        self.delivery.deliver(format, &record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::FixtureMode;
    use crate::models::Frequency;

    fn service(export_dir: &std::path::Path) -> AuditService {
        AuditService::new(
            AuditStore::new(Arc::new(MemoryStore::new())),
            AuditFactory::new(FixtureMode::Demo),
            ReportDelivery::Local(LocalDelivery::new(export_dir)),
        )
    }

    fn form() -> AuditForm {
        AuditForm {
            website: " https://clinic.example ".to_string(),
            region: "EU".to_string(),
            audience: "Patients".to_string(),
            target_questions: (1..=12)
                .map(|i| if i == 3 { "  ".to_string() } else { format!("Question {}?", i) })
                .collect(),
            competitors: vec!["rival.example".to_string(), String::new()],
        }
    }

    #[test]
    fn submit_validates_and_saves() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());

        let record = service.submit_audit(form()).expect("valid form");
        assert_eq!(record.input.website, "https://clinic.example");
        assert_eq!(record.input.target_questions.len(), 11);
        assert_eq!(record.input.competitors, vec!["rival.example".to_string()]);
        assert_eq!(service.latest_audit(), Some(record));
    }

    #[test]
    fn invalid_form_saves_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());
        let mut short = form();
        short.target_questions.truncate(4);

        let error = service.submit_audit(short).expect_err("too few questions");
        assert!(matches!(error, AppError::Validation(_)));
        assert!(service.audit_history().is_empty());
    }

    #[test]
    fn notifications_append_a_revision() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());
        let first = service.submit_audit(form()).expect("submit");

        let updated = service
            .update_notifications(NotificationRequest {
                enabled: true,
                email: "seo@clinic.example".to_string(),
                weekly: false,
                monthly: true,
                attach_report: true,
            })
            .expect("update");

        assert_eq!(updated.meta.audit_id, first.meta.audit_id);
        assert_eq!(updated.settings.mail_notifications.frequency, vec![Frequency::Monthly]);
        assert_eq!(service.audit_history().len(), 2);
        assert_eq!(service.latest_audit(), Some(updated));
    }

    #[test]
    fn settings_update_without_audit_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());
        let error = service
            .update_settings(SettingsPatch {
                download_option: Some(false),
                ..SettingsPatch::default()
            })
            .expect_err("nothing saved");
        assert!(matches!(error, AppError::NotFound(_)));
        assert!(matches!(
            service.update_settings(SettingsPatch::default()),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn download_requires_audit_and_enabled_option() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());

        let missing = service.download_report(ReportFormat::Excel).await.expect_err("no audit");
        assert!(matches!(missing, AppError::NotFound(_)));

        service.submit_audit(form()).expect("submit");
        let delivered = service.download_report(ReportFormat::Excel).await.expect("download");
        assert!(delivered.filename.ends_with(".csv"));

        service
            .update_settings(SettingsPatch {
                download_option: Some(false),
                ..SettingsPatch::default()
            })
            .expect("disable downloads");
        let disabled = service.download_report(ReportFormat::Pdf).await.expect_err("disabled");
        assert!(matches!(disabled, AppError::Disabled(_)));
    }

    #[test]
    fn clear_history_empties_the_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());
        service.submit_audit(form()).expect("submit");
        service.clear_history();
        assert!(service.latest_audit().is_none());
    }

    #[test]
    fn from_config_opens_sqlite_under_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let service = AuditService::from_config(&config).expect("service");
        service.submit_audit(form()).expect("submit");
        assert!(config.database_path().is_file());

        let reopened = AuditService::from_config(&config).expect("reopen");
        assert_eq!(reopened.audit_history().len(), 1);
    }
}
