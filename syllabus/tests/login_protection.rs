//! End to end lockout behavior over SQLite.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use syllabus::{
    AttemptResult, Decision, Event, EventHandler, LockoutConfig, SqliteRepositoryProvider,
    Syllabus, SyllabusBuilder, SyllabusError,
};
use syllabus_core::error::EventError;

const EMAIL: &str = "lecturer@example.edu";
const IP: &str = "203.0.113.7";

#[derive(Default)]
struct LockoutAlerts {
    locked: Mutex<Vec<String>>,
}

#[async_trait]
impl EventHandler for LockoutAlerts {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
        if let Event::AccountLocked { email, .. } = event {
            self.locked.lock().unwrap().push(email.clone());
        }
        Ok(())
    }
}

async fn syllabus() -> Syllabus<SqliteRepositoryProvider> {
    syllabus_with(SyllabusBuilder::new()).await
}

async fn syllabus_with(
    builder: SyllabusBuilder<syllabus::NoStorage>,
) -> Syllabus<SqliteRepositoryProvider> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    builder
        .with_sqlite_pool(pool)
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build Syllabus")
}

#[tokio::test]
async fn five_failures_lock_for_thirty_minutes() {
    let _ = tracing_subscriber::fmt::try_init();
    let syllabus = syllabus().await;

    for attempt in 1..=5u32 {
        assert!(syllabus.check_login(EMAIL, IP).await.unwrap().is_allowed());
        let record = syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();
        assert_eq!(record.consecutive_failures, attempt);
    }

    match syllabus.check_login(EMAIL, IP).await.unwrap() {
        Decision::Denied {
            reason,
            retry_after,
            ..
        } => {
            assert!(reason.starts_with("Too many failed login attempts"));
            assert!(retry_after <= chrono::Duration::minutes(30));
            assert!(retry_after > chrono::Duration::minutes(29));
        }
        Decision::Allowed => panic!("Expected lockout after five failures"),
    }
}

#[tokio::test]
async fn authenticate_never_verifies_while_locked() {
    let syllabus = syllabus().await;
    let verifications = Arc::new(AtomicUsize::new(0));

    for _ in 0..7 {
        let counter = verifications.clone();
        syllabus
            .authenticate(EMAIL, IP, async move {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            })
            .await
            .unwrap();
    }

    // Five verified failures, then two blocked attempts
    assert_eq!(verifications.load(Ordering::SeqCst), 5);

    let counter = verifications.clone();
    let result = syllabus
        .authenticate(EMAIL, IP, async move {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .await
        .unwrap();
    assert!(matches!(result, AttemptResult::Blocked(_)));
    assert_eq!(verifications.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn success_resets_counter() {
    let syllabus = syllabus().await;
    for _ in 0..4 {
        syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();
    }

    let result = syllabus
        .authenticate(EMAIL, IP, async { true })
        .await
        .unwrap();
    match result {
        AttemptResult::Succeeded(record) => {
            assert_eq!(record.consecutive_failures, 0);
            assert!(!record.is_locked);
        }
        other => panic!("Expected success, got {other:?}"),
    }

    let record = syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();
    assert_eq!(record.consecutive_failures, 1);
}

#[tokio::test]
async fn admin_unlock_and_audit_trail() {
    let syllabus = syllabus().await;
    for _ in 0..5 {
        syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();
    }

    assert!(syllabus.unlock(EMAIL, IP, "Identity confirmed by helpdesk").await.unwrap());
    assert!(syllabus.check_login(EMAIL, IP).await.unwrap().is_allowed());

    let events = syllabus.security_events("Lecturer@Example.edu", 20).await.unwrap();
    assert_eq!(events[0].kind, "account_unlocked");
    assert_eq!(events[0].details["reason"], "admin_action");
    assert_eq!(events[0].details["note"], "Identity confirmed by helpdesk");
    assert_eq!(events.iter().filter(|e| e.kind == "account_locked").count(), 1);
}

#[tokio::test]
async fn custom_event_handler_sees_lockouts() {
    let alerts = Arc::new(LockoutAlerts::default());
    let syllabus = syllabus_with(SyllabusBuilder::new().with_event_handler(alerts.clone())).await;

    for _ in 0..5 {
        syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();
    }

    assert_eq!(*alerts.locked.lock().unwrap(), vec![EMAIL.to_string()]);
}

#[tokio::test]
async fn disabled_lockout_never_blocks() {
    let syllabus =
        syllabus_with(SyllabusBuilder::new().with_lockout_config(LockoutConfig::disabled())).await;

    for _ in 0..15 {
        syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();
    }

    assert!(syllabus.check_login(EMAIL, IP).await.unwrap().is_allowed());
    assert!(
        syllabus
            .login_protection()
            .get_record(EMAIL, IP)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn invalid_ip_address_is_a_validation_error() {
    let syllabus = syllabus().await;
    let err = syllabus.check_login(EMAIL, "not-an-ip").await.unwrap_err();
    assert!(matches!(err, SyllabusError::ValidationError(_)));
}

#[tokio::test]
async fn cleanup_keeps_active_records() {
    let syllabus = syllabus().await;
    syllabus.record_login_failure(EMAIL, IP, None).await.unwrap();

    assert_eq!(syllabus.cleanup_login_attempts().await.unwrap(), 0);
    assert!(
        syllabus
            .login_protection()
            .get_record(EMAIL, IP)
            .await
            .unwrap()
            .is_some()
    );
}
