//! Repository traits for data access layer
//!
//! Services talk to storage only through these traits. A storage backend
//! implements each repository and exposes them together through a
//! [`RepositoryProvider`].

pub mod login_attempt;
pub mod security_event;

pub use login_attempt::LoginAttemptRepository;
pub use security_event::SecurityEventRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for login attempt repository access.
pub trait LoginAttemptRepositoryProvider: Send + Sync + 'static {
    /// The login attempt repository implementation type
    type LoginAttemptRepo: LoginAttemptRepository;

    /// Get the login attempt repository
    fn login_attempts(&self) -> &std::sync::Arc<Self::LoginAttemptRepo>;
}

/// Provider trait for security event repository access.
pub trait SecurityEventRepositoryProvider: Send + Sync + 'static {
    /// The security event repository implementation type
    type SecurityEventRepo: SecurityEventRepository;

    /// Get the security event repository
    fn security_events(&self) -> &std::sync::Arc<Self::SecurityEventRepo>;
}

/// Everything a storage backend provides, plus lifecycle hooks.
#[async_trait]
pub trait RepositoryProvider:
    LoginAttemptRepositoryProvider + SecurityEventRepositoryProvider
{
    /// Create or upgrade the schema.
    async fn migrate(&self) -> Result<(), Error>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> Result<(), Error>;
}
