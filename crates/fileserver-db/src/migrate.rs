use sqlx::PgPool;
use tracing::info;

/// Apply pending migrations from `migrations/` (tracked in `_sqlx_migrations`)
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    let migrator = sqlx::migrate!("./migrations");
    info!(
        available = migrator.iter().count(),
        "Running file metadata migrations..."
    );
    migrator.run(pool).await?;
    info!("File metadata migrations completed");
    Ok(())
}
