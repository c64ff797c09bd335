//! SQLite storage backend for syllabus.
//!
//! [`SqliteRepositoryProvider`] bundles the login attempt and security event
//! repositories over one pool and knows how to migrate its schema.
//!
//! ```rust,ignore
//! use syllabus_core::RepositoryProvider;
//! use syllabus_storage_sqlite::SqliteRepositoryProvider;
//!
//! let provider = SqliteRepositoryProvider::connect("sqlite://syllabus.db?mode=rwc").await?;
//! provider.migrate().await?;
//! ```
pub mod migrations;
pub mod repositories;

pub use migrations::SqliteMigrationManager;
pub use repositories::{
    SqliteLoginAttemptRepository, SqliteRepositoryProvider, SqliteSecurityEventRepository,
};
