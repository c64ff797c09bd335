//! Repository trait for the security event log.

use async_trait::async_trait;

use crate::{Error, events::SecurityEvent};

/// Append-only log of security events.
#[async_trait]
pub trait SecurityEventRepository: Send + Sync + 'static {
    async fn record(&self, event: &SecurityEvent) -> Result<(), Error>;

    /// Most recent events for an email, newest first.
    async fn list_for_email(&self, email: &str, limit: u32) -> Result<Vec<SecurityEvent>, Error>;
}
