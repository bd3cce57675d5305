//! Saved shops and the per-shop aggregates shown alongside them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Upper bound on saved rows read for one user.
const SAVED_SHOPS_CAP: i64 = 5000;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavedShopRow {
    pub shop_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewAggregateRow {
    pub shop_id: Uuid,
    pub reviews_count: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PrimaryImageRow {
    pub shop_id: Uuid,
    pub image_url: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfferRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

/// A user's saved shops, most recently saved first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_saved_shops(pool: &PgPool, user_id: Uuid) -> Result<Vec<SavedShopRow>, DbError> {
    let rows = sqlx::query_as::<_, SavedShopRow>(
        "SELECT shop_id, saved_at \
         FROM saved_shops \
         WHERE user_id = $1 \
         ORDER BY saved_at DESC, shop_id \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(SAVED_SHOPS_CAP)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn saved_shop_ids(pool: &PgPool, user_id: Uuid) -> Result<HashSet<Uuid>, DbError> {
    let ids = sqlx::query_scalar::<_, Uuid>("SELECT shop_id FROM saved_shops WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Count and mean of approved review ratings per shop. Shops without approved
/// reviews are absent from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_review_aggregates(
    pool: &PgPool,
    shop_ids: &[Uuid],
) -> Result<Vec<ReviewAggregateRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewAggregateRow>(
        "SELECT shop_id, COUNT(*)::int8 AS reviews_count, AVG(rating)::float8 AS avg_rating \
         FROM reviews \
         WHERE shop_id = ANY($1) AND is_approved = TRUE \
         GROUP BY shop_id",
    )
    .bind(shop_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// First primary image per shop, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_primary_images(
    pool: &PgPool,
    shop_ids: &[Uuid],
) -> Result<Vec<PrimaryImageRow>, DbError> {
    let rows = sqlx::query_as::<_, PrimaryImageRow>(
        "SELECT DISTINCT ON (shop_id) shop_id, image_url \
         FROM shop_images \
         WHERE shop_id = ANY($1) AND is_primary = TRUE \
         ORDER BY shop_id, created_at",
    )
    .bind(shop_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Active offers per shop, newest `valid_from` first, at most `per_shop` each.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_offers(
    pool: &PgPool,
    shop_ids: &[Uuid],
    per_shop: i64,
) -> Result<Vec<OfferRow>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(
        "SELECT id, shop_id, title, description, terms, valid_from, valid_to \
         FROM ( \
             SELECT o.*, ROW_NUMBER() OVER ( \
                 PARTITION BY o.shop_id \
                 ORDER BY o.valid_from DESC NULLS LAST, o.created_at DESC \
             ) AS position \
             FROM offers o \
             WHERE o.shop_id = ANY($1) AND o.is_active = TRUE \
         ) ranked \
         WHERE position <= $2 \
         ORDER BY shop_id, position",
    )
    .bind(shop_ids)
    .bind(per_shop)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
