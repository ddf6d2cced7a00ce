//! Taskboard audit retention worker.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use taskboard_application::AuditLogService;
use taskboard_core::{AppError, AppResult};
use taskboard_infrastructure::PostgresAuditLogRepository;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    retention_days: i64,
    purge_interval_seconds: u64,
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let retention_days = parse_env_i64("AUDIT_RETENTION_DAYS", 365)?;
        let purge_interval_seconds = parse_env_u64("AUDIT_PURGE_INTERVAL_SECONDS", 3600)?;

        if retention_days <= 0 {
            return Err(AppError::Validation(
                "AUDIT_RETENTION_DAYS must be greater than zero".to_owned(),
            ));
        }

        if purge_interval_seconds == 0 {
            return Err(AppError::Validation(
                "AUDIT_PURGE_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            retention_days,
            purge_interval_seconds,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let audit_log_service =
        AuditLogService::new(Arc::new(PostgresAuditLogRepository::new(pool)));

    info!(
        retention_days = config.retention_days,
        purge_interval_seconds = config.purge_interval_seconds,
        "taskboard-worker started"
    );

    loop {
        match audit_log_service.purge_expired(config.retention_days).await {
            Ok(0) => {}
            Ok(purged) => {
                info!(purged, "purged expired audit entries");
            }
            Err(error) => {
                warn!(%error, "audit retention purge failed");
            }
        }

        tokio::time::sleep(Duration::from_secs(config.purge_interval_seconds)).await;
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_i64(name: &str, default: i64) -> AppResult<i64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}
