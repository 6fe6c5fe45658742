use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;
use crate::error::QaError;

/// Connect a shared process-wide pool from config. The pool is cloned into
/// the store and cache; callers release it through [`crate::app::AppContext`].
pub async fn connect(config: &Config) -> Result<PgPool, QaError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .connect(&config.db.url)
        .await?;

    Ok(pool)
}
