//! Per-user recent searches.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHistoryRow {
    pub id: Uuid,
    pub query: String,
    pub target_id: Option<String>,
    pub target_name: Option<String>,
    pub target_type: Option<String>,
    pub searched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSearchHistory<'a> {
    pub query: &'a str,
    pub target_id: Option<&'a str>,
    pub target_name: Option<&'a str>,
    pub target_type: Option<&'a str>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_searches(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<SearchHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, SearchHistoryRow>(
        "SELECT id, query, target_id, target_name, target_type, searched_at \
         FROM search_history \
         WHERE user_id = $1 \
         ORDER BY searched_at DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Records a search, refreshing `searched_at` when the user already ran the
/// same (trimmed) query. Missing targets keep their previous values.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_search_history(
    pool: &PgPool,
    user_id: Uuid,
    entry: &NewSearchHistory<'_>,
) -> Result<SearchHistoryRow, DbError> {
    let row = sqlx::query_as::<_, SearchHistoryRow>(
        "INSERT INTO search_history (user_id, query, target_id, target_name, target_type) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, query) DO UPDATE SET \
             target_id   = COALESCE(EXCLUDED.target_id, search_history.target_id), \
             target_name = COALESCE(EXCLUDED.target_name, search_history.target_name), \
             target_type = COALESCE(EXCLUDED.target_type, search_history.target_type), \
             searched_at = NOW() \
         RETURNING id, query, target_id, target_name, target_type, searched_at",
    )
    .bind(user_id)
    .bind(entry.query.trim())
    .bind(entry.target_id)
    .bind(entry.target_name)
    .bind(entry.target_type)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes one entry owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when no such entry belongs to the user, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn delete_search_history(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM search_history WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Returns the number of entries removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn clear_search_history(pool: &PgPool, user_id: Uuid) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM search_history WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
