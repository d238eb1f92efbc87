use sqlx::{migrate::MigrateError, postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!(
        "Connected to database (max {} connections)",
        config.max_connections
    );
    Ok(pool)
}

/// Applies everything under `migrations/` that has not run yet.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), MigrateError> {
    sqlx::migrate!().run(pool).await?;
    log::info!("Database schema is up to date");
    Ok(())
}
