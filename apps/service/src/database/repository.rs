use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use libsql::params;
use std::path::Path;

use super::models::{self, StoredCheck, StoredCommunication};
use super::HistorySink;
use crate::error::ChannelError;
use crate::monitoring::site::Site;
use crate::monitoring::types::CheckResult;
use crate::pool::{LibsqlManager, LibsqlPool};

/// History stored in a local libsql database
pub struct LibsqlSink {
    pool: LibsqlPool,
}

impl LibsqlSink {
    /// Open (or create) the database file and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self> {
        let path = path.to_string_lossy().to_string();
        let db = libsql::Builder::new_local(&path).build().await?;
        let pool = LibsqlPool::builder(LibsqlManager::new(db))
            .config(deadpool::managed::PoolConfig::default())
            .build()?;

        let conn = pool.get().await?;
        // WAL lets readers proceed while another connection writes.
        conn.query("PRAGMA journal_mode=WAL", ()).await?.next().await?;
        super::initialize_database(&conn).await?;
        drop(conn);

        tracing::info!(path = %path, "Opened libsql history");
        Ok(Self::new_from_pool(pool))
    }

    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }

    async fn save_result(&self, site: &Site, result: &CheckResult) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO check_results (site, timestamp, status, status_code, content_matched, connect_failed, connect_timeout, connect_time_ms, response_time_ms, notes) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                site.name.clone(),
                models::timestamp_to_i64(result.timestamp),
                result.status.to_string(),
                result.status_code.map(|v| v as i64),
                result.content_matched.map(|v| v as i64),
                result.connect_failed as i64,
                result.connect_timeout as i64,
                result.connect_time_ms as i64,
                result.response_time_ms as i64,
                result.notes.clone()
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn save_false_alarm(&self, site: &Site) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO false_alarms (site, timestamp) VALUES (?, ?)",
            params![site.name.clone(), models::timestamp_to_i64(Local::now())],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn save_communication(
        &self,
        site: &Site,
        channel: &str,
        error: Option<String>,
    ) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO communications (site, channel, success, error, timestamp) VALUES (?, ?, ?, ?, ?)",
            params![
                site.name.clone(),
                channel.to_string(),
                error.is_none() as i64,
                error,
                models::timestamp_to_i64(Local::now())
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent check results of a site, newest first
    pub async fn recent_results(&self, site: &str, limit: usize) -> Result<Vec<StoredCheck>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare("SELECT id, site, timestamp, status, status_code, content_matched, connect_failed, connect_timeout, connect_time_ms, response_time_ms, notes FROM check_results WHERE site = ? ORDER BY timestamp DESC, id DESC LIMIT ?")
            .await?;

        let mut rows = stmt.query(params![site.to_string(), limit as i64]).await?;
        let mut results = Vec::new();

        while let Some(row) = rows.next().await? {
            let status: String = row.get(3)?;
            results.push(StoredCheck {
                id: row.get(0)?,
                site: row.get(1)?,
                timestamp: models::i64_to_timestamp(row.get(2)?),
                status: models::status_from_str(&status),
                status_code: row.get::<Option<i64>>(4)?.map(|v| v as u16),
                content_matched: row.get::<Option<i64>>(5)?.map(|v| v != 0),
                connect_failed: row.get::<i64>(6)? != 0,
                connect_timeout: row.get::<i64>(7)? != 0,
                connect_time_ms: row.get::<i64>(8)? as u64,
                response_time_ms: row.get::<i64>(9)? as u64,
                notes: row.get(10)?,
            });
        }

        Ok(results)
    }

    /// Notification outcomes recorded for a site, newest first
    pub async fn communications(&self, site: &str) -> Result<Vec<StoredCommunication>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare("SELECT id, site, channel, success, error, timestamp FROM communications WHERE site = ? ORDER BY id DESC")
            .await?;

        let mut rows = stmt.query(params![site.to_string()]).await?;
        let mut results = Vec::new();

        while let Some(row) = rows.next().await? {
            results.push(StoredCommunication {
                id: row.get(0)?,
                site: row.get(1)?,
                channel: row.get(2)?,
                success: row.get::<i64>(3)? != 0,
                error: row.get(4)?,
                timestamp: models::i64_to_timestamp(row.get(5)?),
            });
        }

        Ok(results)
    }

    pub async fn false_alarm_count(&self, site: &str) -> Result<i64> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM false_alarms WHERE site = ?", params![site.to_string()])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl HistorySink for LibsqlSink {
    async fn log_failure(&self, site: &Site, result: &CheckResult) {
        if let Err(e) = self.save_result(site, result).await {
            tracing::warn!(site = %site.name, error = %e, "Failed to store check failure");
        }
    }

    async fn log_success(&self, site: &Site, result: &CheckResult) {
        if let Err(e) = self.save_result(site, result).await {
            tracing::warn!(site = %site.name, error = %e, "Failed to store check success");
        }
    }

    async fn log_false_alarm(&self, site: &Site) {
        if let Err(e) = self.save_false_alarm(site).await {
            tracing::warn!(site = %site.name, error = %e, "Failed to store false alarm");
        }
    }

    async fn log_communication_success(&self, site: &Site, channel: &str) {
        if let Err(e) = self.save_communication(site, channel, None).await {
            tracing::warn!(site = %site.name, channel, error = %e, "Failed to store notification outcome");
        }
    }

    async fn log_communication_failure(&self, site: &Site, channel: &str, error: &ChannelError) {
        if let Err(e) = self.save_communication(site, channel, Some(error.to_string())).await {
            tracing::warn!(site = %site.name, channel, error = %e, "Failed to store notification outcome");
        }
    }
}
