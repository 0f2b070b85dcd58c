use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const POOL_SIZE: u32 = 10;

/// Open a pool for `url`, creating the database file if needed.
///
/// An in-memory database lives only as long as its connection, so
/// `sqlite::memory:` gets a single connection that is never recycled.
pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("parse database url {}", url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = url.contains(":memory:");
    let mut pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { POOL_SIZE })
        .acquire_timeout(Duration::from_secs(30));
    if in_memory {
        pool = pool.idle_timeout(None::<Duration>).max_lifetime(None::<Duration>);
    }

    let pool = pool
        .connect_with(options)
        .await
        .context("connect to database")?;
    tracing::info!(in_memory, "database connected");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations complete");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:").await.expect("memory db");
    migrate(&pool).await.expect("migrations");
    pool
}
