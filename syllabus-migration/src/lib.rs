//! Schema migration primitives shared by the syllabus storage backends.
//!
//! A backend describes each schema change as a [`Migration`] and applies the
//! list in version order through its [`MigrationManager`]. Applied versions are
//! tracked in a bookkeeping table so a migration runs at most once.
use async_trait::async_trait;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Migrations out of order: version {current} follows {previous}")]
    OutOfOrder { previous: i64, current: i64 },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: i64, // unix seconds
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_syllabus_migrations"
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Rollback migrations
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Checks that migration versions are strictly increasing.
///
/// Managers call this before applying anything so a mis-ordered list fails
/// without touching the schema.
pub fn ensure_ordered<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    for pair in migrations.windows(2) {
        let (previous, current) = (pair[0].version(), pair[1].version());
        if current <= previous {
            return Err(MigrationError::OutOfOrder { previous, current });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Sqlite;

    struct Noop(i64);

    #[async_trait]
    impl Migration<Sqlite> for Noop {
        async fn up<'a>(&'a self, _conn: &'a mut <Sqlite as Database>::Connection) -> Result<()> {
            Ok(())
        }

        async fn down<'a>(&'a self, _conn: &'a mut <Sqlite as Database>::Connection) -> Result<()> {
            Ok(())
        }

        fn version(&self) -> i64 {
            self.0
        }

        fn name(&self) -> &str {
            "Noop"
        }
    }

    fn migrations(versions: &[i64]) -> Vec<Box<dyn Migration<Sqlite>>> {
        versions
            .iter()
            .map(|v| Box::new(Noop(*v)) as Box<dyn Migration<Sqlite>>)
            .collect()
    }

    #[test]
    fn test_ensure_ordered() {
        assert!(ensure_ordered(&migrations(&[])).is_ok());
        assert!(ensure_ordered(&migrations(&[1, 2, 5])).is_ok());
        assert!(matches!(
            ensure_ordered(&migrations(&[1, 3, 2])),
            Err(MigrationError::OutOfOrder {
                previous: 3,
                current: 2
            })
        ));
        assert!(ensure_ordered(&migrations(&[1, 1])).is_err());
    }
}
