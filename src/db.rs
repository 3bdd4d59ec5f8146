use std::str::FromStr;

use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::config::AppConfig;

/// Connect and bring the schema up to date.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let mut opts =
        PgConnectOptions::from_str(&config.database_url).context("parse DATABASE_URL")?;
    if let Some(name) = &config.database_name {
        opts = opts.database(name);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(opts)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("run migrations")?;
    info!(max_connections = config.db_max_connections, "database ready");
    Ok(pool)
}
