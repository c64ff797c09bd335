//! Builder pattern for constructing Syllabus instances
//!
//! Storage is configured first, through the type-state of [`SyllabusBuilder`];
//! everything else has a default.
//!
//! # Example
//!
//! ```rust,no_run
//! use syllabus::{SyllabusBuilder, TargetLevel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let syllabus = SyllabusBuilder::new()
//!         .with_config_from_env()?
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let result = syllabus.analyze_content_for("A short note.", TargetLevel::Elementary);
//!     assert!(result.skipped);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use syllabus_core::{
    AuditLogHandler, ContentValidationService, ContentValidator, EventBus, EventHandler,
    LockoutConfig, LockoutPolicy, LoginProtectionService, ReadabilityConfig, ReadabilityScorer,
    ReadabilityValidator, RepositoryProvider, SyllabusConfig, ValidatorRegistry,
    repositories::{LoginAttemptRepositoryProvider, SecurityEventRepositoryProvider},
};

use crate::Syllabus;

/// Errors that can occur when building a Syllabus instance.
#[derive(Debug, thiserror::Error)]
pub enum SyllabusBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Syllabus`] instances.
///
/// # Defaults
///
/// - Lockout: enabled, 5/7/10 failures lock for 30 min/4 h/24 h
/// - Readability: `high_school`, content under 100 characters skipped
/// - Validators: [`ReadabilityValidator`]
/// - Event handlers: an audit log writing to the security event repository
/// - Apply migrations: false
pub struct SyllabusBuilder<Storage> {
    storage: Storage,
    config: SyllabusConfig,
    validators: Vec<Arc<dyn ContentValidator>>,
    event_handlers: Vec<Arc<dyn EventHandler>>,
    audit_log: bool,
    apply_migrations: bool,
}

impl Default for SyllabusBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl SyllabusBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: SyllabusConfig::default(),
            validators: Vec::new(),
            event_handlers: Vec::new(),
            audit_log: true,
            apply_migrations: false,
        }
    }

    /// Use an existing repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> SyllabusBuilder<WithStorage<R>> {
        self.with_storage(WithStorage { repositories })
    }
}

#[cfg(feature = "sqlite")]
impl SyllabusBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<SyllabusBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>>, SyllabusBuilderError>
    {
        let provider = crate::sqlite::SqliteRepositoryProvider::connect(url)
            .await
            .map_err(|e| SyllabusBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(provider)))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> SyllabusBuilder<WithStorage<crate::sqlite::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::sqlite::SqliteRepositoryProvider::new(pool)))
    }
}

impl<Storage> SyllabusBuilder<Storage> {
    fn with_storage<S>(self, storage: S) -> SyllabusBuilder<S> {
        SyllabusBuilder {
            storage,
            config: self.config,
            validators: self.validators,
            event_handlers: self.event_handlers,
            audit_log: self.audit_log,
            apply_migrations: self.apply_migrations,
        }
    }

    pub fn with_config(mut self, config: SyllabusConfig) -> Self {
        self.config = config;
        self
    }

    /// Read configuration from `SYLLABUS_*` environment variables.
    pub fn with_config_from_env(self) -> Result<Self, SyllabusBuilderError> {
        let config = SyllabusConfig::from_env()
            .map_err(|e| SyllabusBuilderError::InvalidConfiguration(e.to_string()))?;
        Ok(self.with_config(config))
    }

    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.config.lockout = config;
        self
    }

    pub fn with_readability_config(mut self, config: ReadabilityConfig) -> Self {
        self.config.readability = config;
        self
    }

    /// Register an extra validator. A validator named `readability` replaces
    /// the default one.
    pub fn with_validator<T: ContentValidator>(mut self, validator: T) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    /// Skip the default audit log handler.
    pub fn without_audit_log(mut self) -> Self {
        self.audit_log = false;
        self
    }

    /// Run migrations during [`build`](SyllabusBuilder::build).
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<R: RepositoryProvider> SyllabusBuilder<WithStorage<R>> {
    /// Build the [`Syllabus`] instance.
    ///
    /// Fails on an invalid lockout tier table rather than silently using the
    /// defaults.
    pub async fn build(self) -> Result<Syllabus<R>, SyllabusBuilderError> {
        let repositories = self.storage.repositories;
        let config = self.config;

        LockoutPolicy::new(config.lockout.tiers.clone())
            .map_err(|e| SyllabusBuilderError::InvalidConfiguration(e.to_string()))?;

        if self.apply_migrations {
            repositories
                .migrate()
                .await
                .map_err(|e| SyllabusBuilderError::Migration(e.to_string()))?;
        }

        let events = EventBus::new();
        if self.audit_log {
            events
                .register(Arc::new(AuditLogHandler::new(
                    repositories.security_events().clone(),
                )))
                .await;
        }
        for handler in self.event_handlers {
            events.register(handler).await;
        }

        let registry = Arc::new(ValidatorRegistry::new());
        registry.register(ReadabilityValidator::from_config(&config.readability));
        for validator in self.validators {
            registry.register_arc(validator);
        }

        let login_protection = Arc::new(
            LoginProtectionService::new(
                repositories.login_attempts().clone(),
                config.lockout.clone(),
            )
            .with_event_bus(events.clone()),
        );

        tracing::info!(
            lockout.enabled = config.lockout.enabled,
            readability.target_level = %config.readability.target_level,
            validators = registry.len(),
            "Syllabus initialized"
        );

        Ok(Syllabus {
            repositories,
            login_protection,
            content_validation: Arc::new(ContentValidationService::new(registry)),
            scorer: ReadabilityScorer::from_config(&config.readability),
            events,
            config,
        })
    }
}
