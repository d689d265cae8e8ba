//! Connection setup for the `PostgreSQL` store.
//!
//! A city process holds one pool, sized by `infrastructure.max_connections`,
//! and the schema must be current before the first repository query.
//! [`connect_pool`] does both; [`PgStore::open_city`](crate::PgStore::open_city)
//! then binds the pool to a city.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::error::DbError;

/// How long a tick waits for a free connection before the query fails.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool against `url` and run pending migrations.
///
/// # Errors
///
/// Returns [`DbError::Config`] for an unparsable URL, [`DbError::Postgres`]
/// if the server is unreachable, and [`DbError::Migration`] if the schema
/// cannot be brought up to date.
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    let options: PgConnectOptions = url
        .parse()
        .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(max_connections, "connected to PostgreSQL, schema current");
    Ok(pool)
}
