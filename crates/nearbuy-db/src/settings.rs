//! Runtime settings stored in the `app_config` key/value table.

use sqlx::PgPool;

use crate::DbError;

pub const SEARCH_RADIUS_KEY: &str = "search_radius_km";

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<String>, DbError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM app_config WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Category-browse radius. `None` when unset or not a positive number.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_radius_km(pool: &PgPool) -> Result<Option<f64>, DbError> {
    Ok(get_setting(pool, SEARCH_RADIUS_KEY)
        .await?
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0))
}
