use ai_seo_audit_lib::models::{
    AuditData, AuditForm, NotificationRequest, ReportFormat, SettingsPatch, KNOWN_API_SERVICES,
};
use ai_seo_audit_lib::server::ReportServer;
use ai_seo_audit_lib::{init_tracing, AppConfig, AuditService};
use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ai-seo-audit")]
#[command(about = "Create, store and export AI-SEO audits")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(long, global = true, default_value = "ai-seo-audit.yaml")]
    config: PathBuf,

    /// Overrides `dataDir` from the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the report endpoint until interrupted
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a new audit and save it
    Create {
        #[arg(long)]
        website: String,
        #[arg(long)]
        region: String,
        #[arg(long)]
        audience: String,
        /// Repeat for every target question (at least 10)
        #[arg(long = "question")]
        questions: Vec<String>,
        /// Repeat for every competitor domain
        #[arg(long = "competitor")]
        competitors: Vec<String>,
    },
    /// Print the most recent audit
    Latest,
    /// Print every saved audit revision
    History,
    /// Deliver a report for the most recent audit
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Excel)]
        format: FormatArg,
    },
    /// Change download and API key settings
    Settings {
        #[arg(long)]
        download_option: Option<bool>,
        /// `service=key`, e.g. `semrushApi=abc123`; an empty key clears it
        #[arg(long = "api-key")]
        api_keys: Vec<String>,
    },
    /// Change email notification settings
    Notifications {
        #[arg(long)]
        disable: bool,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        weekly: bool,
        #[arg(long)]
        monthly: bool,
        #[arg(long)]
        attach_report: bool,
    },
    /// Delete all saved audits
    Clear,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Excel,
    Pdf,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Excel => ReportFormat::Excel,
            FormatArg::Pdf => ReportFormat::Pdf,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("ai-seo-audit error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(Some(&cli.config)).context("failed to load config")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Err(error) = init_tracing(&config.log_dir(), &config.log_filter) {
        eprintln!("logging disabled: {error}");
    }

    let open_service = || AuditService::from_config(&config);
    match cli.command {
        Commands::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.bind.clone());
            serve(&addr).await?;
        }
        Commands::Create {
            website,
            region,
            audience,
            questions,
            competitors,
        } => {
            let record = open_service()?.submit_audit(AuditForm {
                website,
                region,
                audience,
                target_questions: questions,
                competitors,
            })?;
            print_record(&record)?;
        }
        Commands::Latest => match open_service()?.latest_audit() {
            Some(record) => print_record(&record)?,
            None => println!("No audit data saved."),
        },
        Commands::History => {
            let history: Vec<AuditData> = open_service()?.audit_history().into_iter().map(redacted).collect();
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Commands::Export { format } => {
            let delivered = open_service()?.download_report(format.into()).await?;
            println!("{}", serde_json::to_string_pretty(&delivered)?);
        }
        Commands::Settings {
            download_option,
            api_keys,
        } => {
            let service = open_service()?;
            let api_keys = if api_keys.is_empty() {
                None
            } else {
                let latest = service
                    .latest_audit()
                    .ok_or_else(|| anyhow!("no audit data saved"))?;
                let mut merged = latest.settings.api_keys;
                for pair in api_keys {
                    let (service_key, value) = parse_api_key(&pair)?;
                    merged.insert(service_key, value);
                }
                Some(merged)
            };
            let record = service.update_settings(SettingsPatch {
                download_option,
                api_keys,
                ..SettingsPatch::default()
            })?;
            println!("{}", serde_json::to_string_pretty(&record.settings.redacted())?);
        }
        Commands::Notifications {
            disable,
            email,
            weekly,
            monthly,
            attach_report,
        } => {
            let record = open_service()?.update_notifications(NotificationRequest {
                enabled: !disable,
                email,
                weekly,
                monthly,
                attach_report,
            })?;
            println!("{}", serde_json::to_string_pretty(&record.settings.mail_notifications)?);
        }
        Commands::Clear => {
            open_service()?.clear_history();
            println!("Audit history cleared.");
        }
    }
    Ok(())
}

async fn serve(addr: &str) -> anyhow::Result<()> {
    let server = ReportServer::bind(addr)?;
    if let Some(local) = server.local_addr() {
        println!("Report endpoint listening on http://{local}");
    }
    let (handle, join) = server.spawn();
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    handle.shutdown();
    tokio::task::spawn_blocking(move || join.join())
        .await?
        .map_err(|_| anyhow!("report server thread panicked"))?;
    Ok(())
}

fn parse_api_key(pair: &str) -> anyhow::Result<(String, String)> {
    let Some((service_key, value)) = pair.split_once('=') else {
        bail!("expected service=key, got {pair:?}");
    };
    let service_key = service_key.trim();
    if !KNOWN_API_SERVICES.iter().any(|known| known.key == service_key) {
        let known: Vec<&str> = KNOWN_API_SERVICES.iter().map(|known| known.key).collect();
        bail!("unknown API service {service_key:?} (expected one of {})", known.join(", "));
    }
    Ok((service_key.to_string(), value.trim().to_string()))
}

fn redacted(mut record: AuditData) -> AuditData {
    record.settings = record.settings.redacted();
    record
}

fn print_record(record: &AuditData) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&redacted(record.clone()))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_accepts_bind_override() {
        let cli = Cli::try_parse_from(["ai-seo-audit", "serve", "--bind", "127.0.0.1:0"]).expect("parse serve");
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.as_deref(), Some("127.0.0.1:0")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn create_collects_repeated_questions() {
        let cli = Cli::try_parse_from([
            "ai-seo-audit",
            "--data-dir",
            "/tmp/audit",
            "create",
            "--website",
            "clinic.example",
            "--region",
            "EU",
            "--audience",
            "Patients",
            "--question",
            "q1",
            "--question",
            "q2",
            "--competitor",
            "rival.example",
        ])
        .expect("parse create");
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/audit")));
        match cli.command {
            Commands::Create { questions, competitors, .. } => {
                assert_eq!(questions, vec!["q1".to_string(), "q2".to_string()]);
                assert_eq!(competitors, vec!["rival.example".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn api_key_pairs_must_name_a_known_service() {
        assert_eq!(
            parse_api_key("semrushApi= abc123 ").expect("known service"),
            ("semrushApi".to_string(), "abc123".to_string())
        );
        assert!(parse_api_key("mozApi=abc").is_err());
        assert!(parse_api_key("semrushApi").is_err());
    }
}
