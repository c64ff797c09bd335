//! SQLite implementation of the login attempt repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use syllabus_core::{
    Error, LoginAttemptRecord,
    error::{StorageError, utilities::DatabaseResultExt},
    lockout::AttemptKey,
    repositories::LoginAttemptRepository,
};

/// Login attempt records, one row per (email, IP address).
///
/// Timestamps are stored as unix seconds.
pub struct SqliteLoginAttemptRepository {
    pool: SqlitePool,
}

impl SqliteLoginAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteLoginAttempt {
    email: String,
    ip_address: String,
    consecutive_failures: i64,
    is_locked: bool,
    locked_until: Option<i64>,
    lockout_reason: Option<String>,
    last_attempt: i64,
    created_at: i64,
}

fn timestamp(seconds: i64, column: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| StorageError::Database(format!("Invalid {column} timestamp: {seconds}")))
}

impl TryFrom<SqliteLoginAttempt> for LoginAttemptRecord {
    type Error = StorageError;

    fn try_from(row: SqliteLoginAttempt) -> Result<Self, Self::Error> {
        Ok(LoginAttemptRecord {
            consecutive_failures: u32::try_from(row.consecutive_failures).map_err(|_| {
                StorageError::Database(format!(
                    "Invalid consecutive_failures: {}",
                    row.consecutive_failures
                ))
            })?,
            is_locked: row.is_locked,
            locked_until: row
                .locked_until
                .map(|ts| timestamp(ts, "locked_until"))
                .transpose()?,
            lockout_reason: row.lockout_reason,
            last_attempt: timestamp(row.last_attempt, "last_attempt")?,
            created_at: timestamp(row.created_at, "created_at")?,
            email: row.email,
            ip_address: row.ip_address,
        })
    }
}

#[async_trait]
impl LoginAttemptRepository for SqliteLoginAttemptRepository {
    async fn get(&self, key: &AttemptKey) -> Result<Option<LoginAttemptRecord>, Error> {
        let row = sqlx::query_as::<_, SqliteLoginAttempt>(
            r#"
            SELECT email, ip_address, consecutive_failures, is_locked, locked_until,
                   lockout_reason, last_attempt, created_at
            FROM login_attempts
            WHERE email = ? AND ip_address = ?
            "#,
        )
        .bind(key.email())
        .bind(key.ip_address())
        .fetch_optional(&self.pool)
        .await
        .map_db_err_with_context("Failed to get login attempt record")?;

        Ok(row.map(LoginAttemptRecord::try_from).transpose()?)
    }

    async fn save(&self, record: &LoginAttemptRecord) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (
                email, ip_address, consecutive_failures, is_locked, locked_until,
                lockout_reason, last_attempt, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email, ip_address) DO UPDATE SET
                consecutive_failures = excluded.consecutive_failures,
                is_locked = excluded.is_locked,
                locked_until = excluded.locked_until,
                lockout_reason = excluded.lockout_reason,
                last_attempt = excluded.last_attempt
            "#,
        )
        .bind(&record.email)
        .bind(&record.ip_address)
        .bind(i64::from(record.consecutive_failures))
        .bind(record.is_locked)
        .bind(record.locked_until.map(|t| t.timestamp()))
        .bind(&record.lockout_reason)
        .bind(record.last_attempt.timestamp())
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_db_err_with_context("Failed to save login attempt record")?;

        Ok(())
    }

    async fn delete_stale(
        &self,
        before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        // Records inside an active lockout window are kept regardless of age
        let result = sqlx::query(
            r#"
            DELETE FROM login_attempts
            WHERE last_attempt < ?
            AND NOT (is_locked = 1 AND locked_until IS NOT NULL AND locked_until > ?)
            "#,
        )
        .bind(before.timestamp())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .map_db_err_with_context("Failed to delete stale login attempt records")?;

        Ok(result.rows_affected())
    }
}
