/// Check history persistence
///
/// The monitor only ever writes history; every backend swallows its own
/// errors into warnings so a storage outage never stops the checks.
pub mod console;
pub mod migrations;
pub mod models;
pub mod repository;

#[cfg(test)]
pub mod testing;

pub use console::ConsoleSink;
pub use repository::LibsqlSink;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::ChannelError;
use crate::monitoring::site::Site;
use crate::monitoring::types::CheckResult;

/// Destination for check results and notification outcomes
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn log_failure(&self, site: &Site, result: &CheckResult);

    async fn log_success(&self, site: &Site, result: &CheckResult);

    async fn log_false_alarm(&self, site: &Site);

    async fn log_communication_success(&self, site: &Site, channel: &str);

    async fn log_communication_failure(&self, site: &Site, channel: &str, error: &ChannelError);
}

/// Build the sink selected by `[storage]`.
pub async fn open_sink(storage: &StorageConfig) -> Result<Arc<dyn HistorySink>> {
    match storage {
        StorageConfig::Console => Ok(Arc::new(ConsoleSink)),
        StorageConfig::Libsql { path } => Ok(Arc::new(LibsqlSink::open(path).await?)),
    }
}

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
