//! Repository trait for login attempt records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    lockout::{AttemptKey, LoginAttemptRecord},
};

/// Storage for [`LoginAttemptRecord`]s keyed by (email, IP address).
///
/// # Concurrency
///
/// Implementations do not serialize read-modify-write cycles on their own.
/// Callers that update a record hold a per-key lock around `get` and `save`,
/// as [`LoginProtectionService`](crate::services::LoginProtectionService) does.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync + 'static {
    /// Fetch the record for a pair, or `None` if it has never been seen.
    async fn get(&self, key: &AttemptKey) -> Result<Option<LoginAttemptRecord>, Error>;

    /// Insert or replace the record for `(record.email, record.ip_address)`.
    async fn save(&self, record: &LoginAttemptRecord) -> Result<(), Error>;

    /// Delete records whose last attempt is before `before` and that are not
    /// locked as of `now`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn delete_stale(&self, before: DateTime<Utc>, now: DateTime<Utc>)
    -> Result<u64, Error>;
}
