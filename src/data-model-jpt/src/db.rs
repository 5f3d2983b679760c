use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;

pub type PoolError = deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>;

pub type DbPool = Pool<AsyncPgConnection>;

/// DDL for the `jobs` and `sources` tables. Every statement is idempotent.
const CREATE_TABLES: &str = include_str!("../migrations/2025-01-01-000000_create_jobs_and_sources/up.sql");

#[derive(Debug, thiserror::Error)]
pub enum ConnectionPoolError {
    #[error("Failed to build connection pool: {0}")]
    BuildError(#[from] deadpool::managed::BuildError),
    #[error("Failed to establish initial database connection: {0}")]
    ConnectionError(#[from] PoolError),
    #[error("Failed to create tables: {0}")]
    SchemaError(#[from] diesel::result::Error),
}

pub async fn establish_connection_pool(database_url: &str) -> Result<DbPool, ConnectionPoolError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(config).build()?;

    // Force an initial connection to validate the database is reachable
    // This ensures we fail fast if the DB is unavailable
    let _conn = pool.get().await?;

    Ok(pool)
}

/// Creates the `jobs` and `sources` tables (and the `notified` index) when they don't exist yet.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), ConnectionPoolError> {
    let mut conn = pool.get().await?;
    conn.batch_execute(CREATE_TABLES).await?;
    Ok(())
}
