//! Security events and the bus that delivers them.
//!
//! The login protection service emits an [`Event`] for every attempt it
//! records and every lockout it applies or lifts. Handlers registered on the
//! [`EventBus`] turn these into audit log rows, alerts and the like.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{error::EventError, repositories::SecurityEventRepository};

/// Why a lockout was lifted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnlockReason {
    /// Successful login after the window expired
    LoginSucceeded,
    /// Administrator lifted the lockout
    AdminAction,
}

/// Events emitted by the login protection service.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A credential check failed and was counted.
    LoginFailed {
        email: String,
        ip_address: String,
        consecutive_failures: u32,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A credential check succeeded and the counter was reset.
    LoginSucceeded {
        email: String,
        ip_address: String,
        timestamp: DateTime<Utc>,
    },

    /// An attempt was refused by the pre-check.
    ///
    /// This is emitted before credentials are looked at.
    LoginBlocked {
        email: String,
        ip_address: String,
        locked_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A failure pushed the pair into a lockout window.
    ///
    /// This is a security-critical event that should trigger alerts.
    AccountLocked {
        email: String,
        ip_address: String,
        consecutive_failures: u32,
        locked_until: DateTime<Utc>,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A lockout was lifted.
    AccountUnlocked {
        email: String,
        ip_address: String,
        reason: UnlockReason,
        note: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Stable snake_case name, used as the audit log `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::LoginFailed { .. } => "login_failed",
            Event::LoginSucceeded { .. } => "login_succeeded",
            Event::LoginBlocked { .. } => "login_blocked",
            Event::AccountLocked { .. } => "account_locked",
            Event::AccountUnlocked { .. } => "account_unlocked",
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Event::LoginFailed { email, .. }
            | Event::LoginSucceeded { email, .. }
            | Event::LoginBlocked { email, .. }
            | Event::AccountLocked { email, .. }
            | Event::AccountUnlocked { email, .. } => email,
        }
    }

    pub fn ip_address(&self) -> &str {
        match self {
            Event::LoginFailed { ip_address, .. }
            | Event::LoginSucceeded { ip_address, .. }
            | Event::LoginBlocked { ip_address, .. }
            | Event::AccountLocked { ip_address, .. }
            | Event::AccountUnlocked { ip_address, .. } => ip_address,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::LoginFailed { timestamp, .. }
            | Event::LoginSucceeded { timestamp, .. }
            | Event::LoginBlocked { timestamp, .. }
            | Event::AccountLocked { timestamp, .. }
            | Event::AccountUnlocked { timestamp, .. } => *timestamp,
        }
    }

    /// Event specific fields as a JSON object.
    pub fn details(&self) -> serde_json::Value {
        match self {
            Event::LoginFailed {
                consecutive_failures,
                reason,
                ..
            } => serde_json::json!({
                "consecutive_failures": consecutive_failures,
                "reason": reason,
            }),
            Event::LoginSucceeded { .. } => serde_json::json!({}),
            Event::LoginBlocked { locked_until, .. } => serde_json::json!({
                "locked_until": locked_until,
            }),
            Event::AccountLocked {
                consecutive_failures,
                locked_until,
                reason,
                ..
            } => serde_json::json!({
                "consecutive_failures": consecutive_failures,
                "locked_until": locked_until,
                "reason": reason,
            }),
            Event::AccountUnlocked { reason, note, .. } => serde_json::json!({
                "reason": reason,
                "note": note,
            }),
        }
    }
}

/// One row of the security event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub kind: String,
    pub email: String,
    pub ip_address: String,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl From<&Event> for SecurityEvent {
    fn from(event: &Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: event.kind().to_string(),
            email: event.email().to_string(),
            ip_address: event.ip_address().to_string(),
            details: event.details(),
            occurred_at: event.timestamp(),
        }
    }
}

/// A trait for handling events emitted by the event bus
///
/// Implementors can be registered with the [`EventBus`] to receive every event.
///
/// # Examples
///
/// ```
/// # use syllabus_core::events::{Event, EventHandler};
/// # use syllabus_core::error::EventError;
/// # use async_trait::async_trait;
/// struct AlertOnLockout;
///
/// #[async_trait]
/// impl EventHandler for AlertOnLockout {
///     async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
///         if let Event::AccountLocked { email, .. } = event {
///             println!("locked: {email}");
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Emit an event to all registered handlers
    ///
    /// A failing handler does not stop delivery to the ones after it. The
    /// first error is returned once every handler has run.
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        let mut first_error = None;
        for handler in self.handlers.read().await.iter() {
            if let Err(e) = handler.handle_event(event).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Persists every event to the security event log.
pub struct AuditLogHandler<R: SecurityEventRepository> {
    repository: Arc<R>,
}

impl<R: SecurityEventRepository> AuditLogHandler<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: SecurityEventRepository> EventHandler for AuditLogHandler<R> {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
        self.repository
            .record(&SecurityEvent::from(event))
            .await
            .map_err(|e| EventError::HandlerError(e.to_string()))
    }
}
