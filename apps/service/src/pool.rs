use deadpool::managed::{self, Pool, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError};
use std::time::Duration;

/// How long a connection waits on a locked database before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LibsqlManager {
    database: Database,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.database.connect()?;
        // Pooled connections write concurrently; wait for the lock instead of failing.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        conn.query("SELECT 1", ()).await?.next().await?.ok_or(LibsqlError::QueryReturnedNoRows)?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;
