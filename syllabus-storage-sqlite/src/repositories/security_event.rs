//! SQLite implementation of the security event log.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use syllabus_core::{
    Error, SecurityEvent,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::SecurityEventRepository,
};
use uuid::Uuid;

pub struct SqliteSecurityEventRepository {
    pool: SqlitePool,
}

impl SqliteSecurityEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteSecurityEvent {
    id: String,
    kind: String,
    email: String,
    ip_address: String,
    details: String,
    occurred_at: i64,
}

impl TryFrom<SqliteSecurityEvent> for SecurityEvent {
    type Error = StorageError;

    fn try_from(row: SqliteSecurityEvent) -> Result<Self, Self::Error> {
        Ok(SecurityEvent {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| StorageError::Database(format!("Invalid event id {}: {e}", row.id)))?,
            details: serde_json::from_str(&row.details)
                .map_err(|e| StorageError::Database(format!("Invalid event details: {e}")))?,
            occurred_at: DateTime::from_timestamp(row.occurred_at, 0).ok_or_else(|| {
                StorageError::Database(format!("Invalid occurred_at timestamp: {}", row.occurred_at))
            })?,
            kind: row.kind,
            email: row.email,
            ip_address: row.ip_address,
        })
    }
}

#[async_trait]
impl SecurityEventRepository for SqliteSecurityEventRepository {
    async fn record(&self, event: &SecurityEvent) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO security_events (id, kind, email, ip_address, details, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.kind)
        .bind(&event.email)
        .bind(&event.ip_address)
        .bind(event.details.to_string())
        .bind(event.occurred_at.timestamp())
        .execute(&self.pool)
        .await
        .map_db_err_with_context("Failed to record security event")?;

        Ok(())
    }

    async fn list_for_email(&self, email: &str, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        let rows = sqlx::query_as::<_, SqliteSecurityEvent>(
            r#"
            SELECT id, kind, email, ip_address, details, occurred_at
            FROM security_events
            WHERE email = ?
            ORDER BY occurred_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(email)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_db_err_with_context("Failed to list security events")?;

        rows.into_iter()
            .map(|row| SecurityEvent::try_from(row).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{SqliteMigrationManager, all_migrations};
    use chrono::{Duration, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use syllabus_migration::MigrationManager;

    async fn setup() -> SqliteSecurityEventRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");
        let manager = SqliteMigrationManager::new(pool.clone());
        manager.initialize().await.unwrap();
        manager.up(&all_migrations()).await.unwrap();
        SqliteSecurityEventRepository::new(pool)
    }

    fn event(kind: &str, email: &str, occurred_at: DateTime<Utc>) -> SecurityEvent {
        SecurityEvent {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            email: email.to_string(),
            ip_address: "10.0.0.1".to_string(),
            details: serde_json::json!({ "consecutive_failures": 5 }),
            occurred_at: DateTime::from_timestamp(occurred_at.timestamp(), 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let repo = setup().await;
        let now = Utc::now();

        let first = event("login_failed", "lecturer@example.edu", now - Duration::minutes(2));
        let second = event("account_locked", "lecturer@example.edu", now);
        let other = event("login_failed", "student@example.edu", now);
        repo.record(&first).await.unwrap();
        repo.record(&second).await.unwrap();
        repo.record(&other).await.unwrap();

        let events = repo.list_for_email("lecturer@example.edu", 10).await.unwrap();
        assert_eq!(events, vec![second, first]);
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let repo = setup().await;
        let now = Utc::now();
        for _ in 0..5 {
            repo.record(&event("login_failed", "lecturer@example.edu", now))
                .await
                .unwrap();
        }

        let events = repo.list_for_email("lecturer@example.edu", 3).await.unwrap();
        assert_eq!(events.len(), 3);
    }
}
