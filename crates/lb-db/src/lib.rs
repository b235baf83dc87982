//! Postgres persistence for machine records. The schema is the `machines`
//! table and `machine_state` enum from `migrations/0001_machines.sql`.

pub mod models;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

/// Embedded migrations; `0001_machines` creates the `machines` table.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connect a pool sized for a single provisioning run.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Bring the `machines` schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
