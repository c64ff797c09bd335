//! Brute force protection for logins, tracked per (email, IP address).
//!
//! This service runs the [`LockoutPolicy`] against a
//! [`LoginAttemptRepository`]. It serializes updates to the same pair, persists
//! the resulting records and emits security events.
//!
//! # Example
//!
//! ```rust,ignore
//! use syllabus_core::services::{AttemptResult, LoginProtectionService};
//! use syllabus_core::LockoutConfig;
//!
//! let service = LoginProtectionService::new(repository, LockoutConfig::default());
//!
//! match service
//!     .authenticate("lecturer@example.edu", "203.0.113.7", verify_password(..))
//!     .await?
//! {
//!     AttemptResult::Succeeded(_) => { /* issue a session */ }
//!     AttemptResult::Failed(_) => { /* 401 */ }
//!     AttemptResult::Blocked(decision) => { /* 423 with decision.retry_after_seconds() */ }
//! }
//! ```

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    Error,
    config::LockoutConfig,
    events::{Event, EventBus, UnlockReason},
    lockout::{AttemptKey, AttemptOutcome, Decision, LockoutPolicy, LoginAttemptRecord},
    repositories::LoginAttemptRepository,
};

/// How often the background cleanup runs.
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Outcome of [`LoginProtectionService::authenticate`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    /// Credentials were valid; the record has been reset.
    Succeeded(LoginAttemptRecord),
    /// Credentials were invalid; the failure has been counted.
    Failed(LoginAttemptRecord),
    /// The pair is locked out. Credentials were never checked.
    Blocked(Decision),
}

/// Service for tracking login attempts and enforcing lockouts.
///
/// # Thread Safety
///
/// Updates to one (email, IP address) pair are serialized with a per-key async
/// mutex, so concurrent failures are never lost. Different pairs proceed in
/// parallel. Serializing writers across processes is up to the repository.
pub struct LoginProtectionService<R: LoginAttemptRepository> {
    repository: Arc<R>,
    policy: LockoutPolicy,
    config: LockoutConfig,
    events: EventBus,
    key_locks: DashMap<AttemptKey, Arc<Mutex<()>>>,
}

impl<R: LoginAttemptRepository> LoginProtectionService<R> {
    pub fn new(repository: Arc<R>, config: LockoutConfig) -> Self {
        Self {
            repository,
            policy: config.policy(),
            config,
            events: EventBus::new(),
            key_locks: DashMap::new(),
        }
    }

    /// Emit events on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Pre-check an attempt before verifying credentials.
    ///
    /// Emits [`Event::LoginBlocked`] when the pair is locked out.
    pub async fn check(&self, email: &str, ip_address: &str) -> Result<Decision, Error> {
        let key = AttemptKey::new(email, ip_address)?;
        self.check_key(&key, Utc::now()).await
    }

    /// Run a full attempt: pre-check, verify, record.
    ///
    /// `verify` is only awaited when the pre-check allows the attempt. The
    /// per-key lock is held for the whole attempt.
    pub async fn authenticate<F>(
        &self,
        email: &str,
        ip_address: &str,
        verify: F,
    ) -> Result<AttemptResult, Error>
    where
        F: Future<Output = bool> + Send,
    {
        let key = AttemptKey::new(email, ip_address)?;
        let now = Utc::now();

        let _lease = self.lease(&key);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let result = match self.check_key(&key, now).await? {
            Decision::Allowed => {
                if verify.await {
                    let record = self.apply(&key, &AttemptOutcome::Success, now).await?;
                    AttemptResult::Succeeded(record)
                } else {
                    let record = self.apply(&key, &AttemptOutcome::failure(), now).await?;
                    AttemptResult::Failed(record)
                }
            }
            denied => AttemptResult::Blocked(denied),
        };

        Ok(result)
    }

    /// Record a successful login, resetting the failure counter.
    pub async fn record_success(
        &self,
        email: &str,
        ip_address: &str,
    ) -> Result<LoginAttemptRecord, Error> {
        let key = AttemptKey::new(email, ip_address)?;
        self.record_outcome(&key, &AttemptOutcome::Success).await
    }

    /// Record a failed login. `reason` defaults to "Invalid credentials".
    pub async fn record_failure(
        &self,
        email: &str,
        ip_address: &str,
        reason: Option<&str>,
    ) -> Result<LoginAttemptRecord, Error> {
        let key = AttemptKey::new(email, ip_address)?;
        let outcome = reason.map_or_else(AttemptOutcome::failure, AttemptOutcome::failure_with);
        self.record_outcome(&key, &outcome).await
    }

    /// Record an outcome under the per-key lock.
    ///
    /// Callers must have run [`check`](Self::check) first; a pair that is
    /// locked out should never reach this.
    pub async fn record_outcome(
        &self,
        key: &AttemptKey,
        outcome: &AttemptOutcome,
    ) -> Result<LoginAttemptRecord, Error> {
        let now = Utc::now();
        let _lease = self.lease(key);
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.apply(key, outcome, now).await
    }

    /// Administrative unlock.
    ///
    /// # Returns
    ///
    /// `true` if the pair was locked out at the time of the call, `false`
    /// otherwise (including pairs that have never been seen).
    pub async fn unlock(
        &self,
        email: &str,
        ip_address: &str,
        reason: &str,
    ) -> Result<bool, Error> {
        let key = AttemptKey::new(email, ip_address)?;
        let now = Utc::now();

        let _lease = self.lease(&key);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;
        self.unlock_key(&key, reason, now).await
    }

    /// Current stored record for a pair, if any.
    pub async fn get_record(
        &self,
        email: &str,
        ip_address: &str,
    ) -> Result<Option<LoginAttemptRecord>, Error> {
        let key = AttemptKey::new(email, ip_address)?;
        self.repository.get(&key).await
    }

    /// Delete records idle for longer than the retention period that are not
    /// currently locked.
    pub async fn cleanup_stale(&self) -> Result<u64, Error> {
        let now = Utc::now();
        let count = self
            .repository
            .delete_stale(now - self.config.retention_period, now)
            .await?;
        if count > 0 {
            tracing::info!(count, "Cleaned up stale login attempt records");
        }
        Ok(count)
    }

    /// Start the background cleanup task.
    ///
    /// Runs [`cleanup_stale`](Self::cleanup_stale) hourly until `shutdown`
    /// changes.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let retention = self.config.retention_period;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(CLEANUP_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let now = Utc::now();
                        match repository.delete_stale(now - retention, now).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Cleaned up stale login attempt records");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to clean up login attempt records");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt cleanup task");
                        break;
                    }
                }
            }
        })
    }

    async fn check_key(&self, key: &AttemptKey, now: DateTime<Utc>) -> Result<Decision, Error> {
        if !self.config.enabled {
            return Ok(Decision::Allowed);
        }

        let record = self.repository.get(key).await?;
        let decision = self.policy.evaluate_pre_check(record.as_ref(), now);

        if let Decision::Denied { locked_until, .. } = &decision {
            tracing::info!(email = %key.email(), ip_address = %key.ip_address(), "Login blocked by lockout");
            self.emit(Event::LoginBlocked {
                email: key.email().to_string(),
                ip_address: key.ip_address().to_string(),
                locked_until: *locked_until,
                timestamp: now,
            })
            .await;
        }

        Ok(decision)
    }

    /// Read-modify-write of one record. The per-key lock must be held.
    async fn apply(
        &self,
        key: &AttemptKey,
        outcome: &AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<LoginAttemptRecord, Error> {
        if !self.config.enabled {
            return Ok(LoginAttemptRecord::new(key, now));
        }

        let record = self
            .repository
            .get(key)
            .await?
            .unwrap_or_else(|| LoginAttemptRecord::new(key, now));
        let was_locked = record.is_currently_locked(now);
        let had_lock_flag = record.is_locked;

        let updated = self.policy.record_outcome(record, outcome, now);
        self.repository.save(&updated).await?;

        match outcome {
            AttemptOutcome::Success => {
                self.emit(Event::LoginSucceeded {
                    email: updated.email.clone(),
                    ip_address: updated.ip_address.clone(),
                    timestamp: now,
                })
                .await;
                if had_lock_flag {
                    self.emit(Event::AccountUnlocked {
                        email: updated.email.clone(),
                        ip_address: updated.ip_address.clone(),
                        reason: UnlockReason::LoginSucceeded,
                        note: None,
                        timestamp: now,
                    })
                    .await;
                }
            }
            AttemptOutcome::Failure { reason } => {
                self.emit(Event::LoginFailed {
                    email: updated.email.clone(),
                    ip_address: updated.ip_address.clone(),
                    consecutive_failures: updated.consecutive_failures,
                    reason: reason.clone(),
                    timestamp: now,
                })
                .await;
                if let (false, Some(locked_until)) = (was_locked, updated.locked_until) {
                    if updated.is_currently_locked(now) {
                        self.emit(Event::AccountLocked {
                            email: updated.email.clone(),
                            ip_address: updated.ip_address.clone(),
                            consecutive_failures: updated.consecutive_failures,
                            locked_until,
                            reason: updated.lockout_reason.clone().unwrap_or_default(),
                            timestamp: now,
                        })
                        .await;
                    }
                }
            }
        }

        Ok(updated)
    }

    async fn unlock_key(
        &self,
        key: &AttemptKey,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let Some(record) = self.repository.get(key).await? else {
            return Ok(false);
        };

        let was_locked = record.is_currently_locked(now);
        let updated = self.policy.unlock(record, reason);
        self.repository.save(&updated).await?;

        tracing::info!(
            email = %key.email(),
            ip_address = %key.ip_address(),
            was_locked,
            "Login attempts unlocked by administrator"
        );
        self.emit(Event::AccountUnlocked {
            email: updated.email.clone(),
            ip_address: updated.ip_address.clone(),
            reason: UnlockReason::AdminAction,
            note: Some(reason.to_string()),
            timestamp: now,
        })
        .await;

        Ok(was_locked)
    }

    /// Event delivery never fails the attempt itself.
    async fn emit(&self, event: Event) {
        if let Err(e) = self.events.emit(&event).await {
            tracing::warn!(error = %e, kind = event.kind(), "Failed to deliver security event");
        }
    }

    fn key_lock(&self, key: &AttemptKey) -> Arc<Mutex<()>> {
        Arc::clone(&self.key_locks.entry(key.clone()).or_default())
    }

    /// Must be bound before the mutex handle it covers so that it drops last.
    fn lease<'a>(&'a self, key: &'a AttemptKey) -> KeyLockLease<'a> {
        KeyLockLease {
            locks: &self.key_locks,
            key,
        }
    }
}

/// Forgets a key's mutex once no task holds a handle to it.
///
/// Runs on every exit path, including errors and cancelled futures.
struct KeyLockLease<'a> {
    locks: &'a DashMap<AttemptKey, Arc<Mutex<()>>>,
    key: &'a AttemptKey,
}

impl Drop for KeyLockLease<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{EventError, StorageError},
        events::EventHandler,
    };
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Mock repository for testing
    ///
    /// `get` yields to the scheduler so unsynchronized read-modify-write
    /// cycles would interleave.
    #[derive(Default)]
    struct MockLoginAttemptRepository {
        records: StdMutex<HashMap<AttemptKey, LoginAttemptRecord>>,
        saves: StdMutex<usize>,
    }

    #[async_trait]
    impl LoginAttemptRepository for MockLoginAttemptRepository {
        async fn get(&self, key: &AttemptKey) -> Result<Option<LoginAttemptRecord>, Error> {
            let record = self.records.lock().unwrap().get(key).cloned();
            tokio::task::yield_now().await;
            Ok(record)
        }

        async fn save(&self, record: &LoginAttemptRecord) -> Result<(), Error> {
            self.records
                .lock()
                .unwrap()
                .insert(record.key(), record.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        async fn delete_stale(
            &self,
            before: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> Result<u64, Error> {
            let mut records = self.records.lock().unwrap();
            let before_len = records.len();
            records.retain(|_, r| r.last_attempt >= before || r.is_currently_locked(now));
            Ok((before_len - records.len()) as u64)
        }
    }

    /// Repository whose storage is unreachable.
    struct UnavailableRepository;

    #[async_trait]
    impl LoginAttemptRepository for UnavailableRepository {
        async fn get(&self, _key: &AttemptKey) -> Result<Option<LoginAttemptRecord>, Error> {
            Err(StorageError::Database("database is locked".to_string()).into())
        }

        async fn save(&self, _record: &LoginAttemptRecord) -> Result<(), Error> {
            Err(StorageError::Database("database is locked".to_string()).into())
        }

        async fn delete_stale(
            &self,
            _before: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<u64, Error> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        kinds: StdMutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
            self.kinds.lock().unwrap().push(event.kind());
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle_event(&self, _event: &Event) -> Result<(), EventError> {
            Err(EventError::HandlerError("audit log offline".to_string()))
        }
    }

    const EMAIL: &str = "lecturer@example.edu";
    const IP: &str = "192.168.1.10";

    fn service() -> (
        Arc<MockLoginAttemptRepository>,
        LoginProtectionService<MockLoginAttemptRepository>,
    ) {
        let repo = Arc::new(MockLoginAttemptRepository::default());
        let service = LoginProtectionService::new(repo.clone(), LockoutConfig::default());
        (repo, service)
    }

    #[tokio::test]
    async fn test_disabled_protection_allows_and_records_nothing() {
        let repo = Arc::new(MockLoginAttemptRepository::default());
        let service = LoginProtectionService::new(repo.clone(), LockoutConfig::disabled());
        assert!(!service.is_enabled());

        for _ in 0..12 {
            let record = service.record_failure(EMAIL, IP, None).await.unwrap();
            assert_eq!(record.consecutive_failures, 0);
        }

        assert!(service.check(EMAIL, IP).await.unwrap().is_allowed());
        assert_eq!(*repo.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lockout_after_five_failures() {
        let (_repo, service) = service();

        for n in 1..=4 {
            assert!(service.check(EMAIL, IP).await.unwrap().is_allowed());
            let record = service.record_failure(EMAIL, IP, None).await.unwrap();
            assert_eq!(record.consecutive_failures, n);
            assert!(!record.is_locked);
        }

        let record = service.record_failure(EMAIL, IP, None).await.unwrap();
        assert!(record.is_locked);
        let window = record.locked_until.unwrap() - record.last_attempt;
        assert_eq!(window, Duration::minutes(30));

        let decision = service.check(EMAIL, IP).await.unwrap();
        let retry_after = decision.retry_after_seconds().unwrap();
        assert!(retry_after > 1790 && retry_after <= 1800);
    }

    #[tokio::test]
    async fn test_email_is_normalized() {
        let (_repo, service) = service();
        service
            .record_failure("Lecturer@Example.EDU", IP, None)
            .await
            .unwrap();
        let record = service
            .record_failure(" lecturer@example.edu ", IP, None)
            .await
            .unwrap();
        assert_eq!(record.consecutive_failures, 2);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let (_repo, service) = service();
        for _ in 0..3 {
            service.record_failure(EMAIL, IP, None).await.unwrap();
        }

        let record = service.record_success(EMAIL, IP).await.unwrap();
        assert_eq!(record.consecutive_failures, 0);

        let stored = service.get_record(EMAIL, IP).await.unwrap().unwrap();
        assert_eq!(stored.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_authenticate_blocks_without_verifying() {
        let (_repo, service) = service();
        for _ in 0..5 {
            let result = service
                .authenticate(EMAIL, IP, async { false })
                .await
                .unwrap();
            assert!(matches!(result, AttemptResult::Failed(_)));
        }

        let verified = Arc::new(AtomicBool::new(false));
        let flag = verified.clone();
        let result = service
            .authenticate(EMAIL, IP, async move {
                flag.store(true, Ordering::SeqCst);
                true
            })
            .await
            .unwrap();

        assert!(matches!(result, AttemptResult::Blocked(Decision::Denied { .. })));
        assert!(!verified.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let (_repo, service) = service();
        service.record_failure(EMAIL, IP, None).await.unwrap();

        let result = service
            .authenticate(EMAIL, IP, async { true })
            .await
            .unwrap();
        match result {
            AttemptResult::Succeeded(record) => assert_eq!(record.consecutive_failures, 0),
            other => panic!("Expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_different_pairs_tracked_separately() {
        let (_repo, service) = service();
        for _ in 0..5 {
            service.record_failure(EMAIL, IP, None).await.unwrap();
        }

        assert!(service.check(EMAIL, IP).await.unwrap().is_denied());
        assert!(service.check(EMAIL, "192.168.1.11").await.unwrap().is_allowed());
        assert!(
            service
                .check("student@example.edu", IP)
                .await
                .unwrap()
                .is_allowed()
        );
    }

    #[tokio::test]
    async fn test_unlock_returns_was_locked() {
        let (_repo, service) = service();
        assert!(!service.unlock(EMAIL, IP, "never seen").await.unwrap());

        for _ in 0..5 {
            service.record_failure(EMAIL, IP, None).await.unwrap();
        }

        assert!(service.unlock(EMAIL, IP, "identity confirmed").await.unwrap());
        assert!(service.check(EMAIL, IP).await.unwrap().is_allowed());

        let record = service.get_record(EMAIL, IP).await.unwrap().unwrap();
        assert_eq!(record.consecutive_failures, 0);
        assert_eq!(
            record.lockout_reason.as_deref(),
            Some("Unlocked: identity confirmed")
        );

        assert!(!service.unlock(EMAIL, IP, "again").await.unwrap());
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let (_repo, service) = service();
        let handler = Arc::new(RecordingHandler::default());
        service.events().register(handler.clone()).await;

        for _ in 0..5 {
            service.record_failure(EMAIL, IP, None).await.unwrap();
        }
        service.check(EMAIL, IP).await.unwrap();
        service.unlock(EMAIL, IP, "helpdesk ticket").await.unwrap();
        service.record_success(EMAIL, IP).await.unwrap();

        let kinds = handler.kinds.lock().unwrap().clone();
        assert_eq!(
            kinds,
            vec![
                "login_failed",
                "login_failed",
                "login_failed",
                "login_failed",
                "login_failed",
                "account_locked",
                "login_blocked",
                "account_unlocked",
                "login_succeeded",
            ]
        );
    }

    #[tokio::test]
    async fn test_handler_errors_do_not_fail_attempts() {
        let (_repo, service) = service();
        service.events().register(Arc::new(FailingHandler)).await;

        let record = service.record_failure(EMAIL, IP, Some("Unknown account")).await.unwrap();
        assert_eq!(record.consecutive_failures, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_not_lost() {
        let _ = tracing_subscriber::fmt().try_init();
        let repo = Arc::new(MockLoginAttemptRepository::default());
        let config = LockoutConfig {
            tiers: vec![crate::lockout::LockoutTier::new(
                1000,
                Duration::minutes(1),
                "Too many attempts",
            )],
            ..Default::default()
        };
        let service = Arc::new(LoginProtectionService::new(repo, config));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.record_failure(EMAIL, IP, None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = service.get_record(EMAIL, IP).await.unwrap().unwrap();
        assert_eq!(record.consecutive_failures, 25);
        assert!(service.key_locks.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_locked_records() {
        let (repo, service) = service();
        let now = Utc::now();
        let old = now - Duration::days(45);

        let stale_key = AttemptKey::new("old@example.edu", IP).unwrap();
        let mut stale = LoginAttemptRecord::new(&stale_key, old);
        stale.consecutive_failures = 2;
        repo.save(&stale).await.unwrap();

        let locked_key = AttemptKey::new("locked@example.edu", IP).unwrap();
        let mut locked = LoginAttemptRecord::new(&locked_key, old);
        locked.is_locked = true;
        locked.locked_until = Some(now + Duration::hours(1));
        locked.lockout_reason = Some("Excessive login attempts: Invalid credentials".to_string());
        repo.save(&locked).await.unwrap();

        service.record_failure(EMAIL, IP, None).await.unwrap();

        assert_eq!(service.cleanup_stale().await.unwrap(), 1);
        assert!(repo.get(&stale_key).await.unwrap().is_none());
        assert!(repo.get(&locked_key).await.unwrap().is_some());
        assert!(service.get_record(EMAIL, IP).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let (_repo, service) = service();
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = service.start_cleanup_task(rx);
        tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("cleanup task did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_ip_is_rejected() {
        let (_repo, service) = service();
        let err = service.check(EMAIL, "999.1.1.1").await.unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn test_storage_errors_release_key_locks() {
        let service =
            LoginProtectionService::new(Arc::new(UnavailableRepository), LockoutConfig::default());

        for n in 0..50 {
            let ip = format!("10.0.0.{n}");
            let err = service
                .authenticate(EMAIL, &ip, async { true })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Storage(_)));
            assert!(service.record_failure(EMAIL, &ip, None).await.is_err());
            assert!(service.unlock(EMAIL, &ip, "helpdesk").await.is_err());
        }

        assert!(service.key_locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_attempt_releases_key_lock() {
        let (_repo, service) = service();

        let attempt = service.authenticate(EMAIL, IP, std::future::pending::<bool>());
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), attempt).await;
        assert!(timed_out.is_err());
        assert!(service.key_locks.is_empty());

        let record = service.record_failure(EMAIL, IP, None).await.unwrap();
        assert_eq!(record.consecutive_failures, 1);
        assert!(service.key_locks.is_empty());
    }
}
