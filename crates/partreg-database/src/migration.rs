//! Embedded schema migrations.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use partreg_core::error::{AppError, ErrorKind};
use partreg_core::result::AppResult;

/// The registry schema migrations, compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the registry schema up to date.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run registry migrations: {e}"),
            e,
        )
    })?;

    info!(known = MIGRATOR.migrations.len(), "Registry schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_migrations_are_embedded() {
        assert!(!MIGRATOR.migrations.is_empty());
    }
}
