//! Main-category reads.

use nearbuy_core::BoundingBox;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
}

/// One active category paired with the location of one of its active shops.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryPointRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryShopRow {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, image_url \
         FROM main_categories \
         WHERE is_active = TRUE \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Active categories with the coordinates of their active shops inside `bbox`.
///
/// A category appears once per shop; callers re-check the exact distance and
/// collapse duplicates.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories_near(
    pool: &PgPool,
    bbox: BoundingBox,
) -> Result<Vec<CategoryPointRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryPointRow>(
        "SELECT c.id, c.name, c.image_url, \
                s.latitude::float8 AS latitude, s.longitude::float8 AS longitude \
         FROM main_categories c \
         JOIN shops s ON s.category_id = c.id \
         WHERE c.is_active = TRUE \
           AND s.is_active = TRUE \
           AND s.latitude IS NOT NULL AND s.longitude IS NOT NULL \
           AND s.latitude::float8 BETWEEN $1 AND $2 \
           AND s.longitude::float8 BETWEEN $3 AND $4 \
         ORDER BY c.name, c.id",
    )
    .bind(bbox.min_lat)
    .bind(bbox.max_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lng)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Active shops of one category, in creation order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_shops(
    pool: &PgPool,
    category_id: Uuid,
) -> Result<Vec<CategoryShopRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryShopRow>(
        "SELECT id, name, logo_url, address, city, \
                latitude::float8 AS latitude, longitude::float8 AS longitude, \
                avg_rating::float8 AS avg_rating, review_count::int8 AS review_count \
         FROM shops \
         WHERE category_id = $1 AND is_active = TRUE \
         ORDER BY created_at, id",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Case-insensitive lookup used when seeding sections.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category_id_by_name(pool: &PgPool, name: &str) -> Result<Option<Uuid>, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM main_categories WHERE LOWER(name) = LOWER($1) LIMIT 1",
    )
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;
    Ok(id)
}
