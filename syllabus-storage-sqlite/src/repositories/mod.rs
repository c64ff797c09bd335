//! Repository implementations for SQLite storage

pub mod login_attempt;
pub mod security_event;

pub use login_attempt::SqliteLoginAttemptRepository;
pub use security_event::SqliteSecurityEventRepository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use syllabus_core::{
    Error,
    error::StorageError,
    repositories::{
        LoginAttemptRepositoryProvider, RepositoryProvider, SecurityEventRepositoryProvider,
    },
};
use syllabus_migration::MigrationManager;

use crate::migrations::{SqliteMigrationManager, all_migrations};

/// Repository provider implementation for SQLite
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    login_attempts: Arc<SqliteLoginAttemptRepository>,
    security_events: Arc<SqliteSecurityEventRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let login_attempts = Arc::new(SqliteLoginAttemptRepository::new(pool.clone()));
        let security_events = Arc::new(SqliteSecurityEventRepository::new(pool.clone()));

        Self {
            pool,
            login_attempts,
            security_events,
        }
    }

    /// Open a pool for `database_url`, e.g. `sqlite://syllabus.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            Error::Storage(StorageError::Connection(e.to_string()))
        })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LoginAttemptRepositoryProvider for SqliteRepositoryProvider {
    type LoginAttemptRepo = SqliteLoginAttemptRepository;

    fn login_attempts(&self) -> &Arc<Self::LoginAttemptRepo> {
        &self.login_attempts
    }
}

impl SecurityEventRepositoryProvider for SqliteRepositoryProvider {
    type SecurityEventRepo = SqliteSecurityEventRepository;

    fn security_events(&self) -> &Arc<Self::SecurityEventRepo> {
        &self.security_events
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&all_migrations()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(format!(
                "Failed to run migrations: {e}"
            )))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}
