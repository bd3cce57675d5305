//! Shop and menu reads feeding the ranking pipeline, plus shop detail pages.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nearbuy_core::{CategoryRef, MenuItem, ShopQuery, ShopRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ShopRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    address: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    logo_url: Option<String>,
    avg_rating: Option<f64>,
    review_count: Option<i64>,
    open_hours: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    shop_id: Uuid,
    item_name: String,
    description: Option<String>,
    price: Option<Decimal>,
    category_name: Option<String>,
    image_url: Option<String>,
    is_available: bool,
    is_quick_snack: bool,
}

impl From<MenuRow> for MenuItem {
    fn from(row: MenuRow) -> Self {
        Self {
            id: row.id,
            item_name: row.item_name,
            description: row.description,
            price: row.price.as_ref().and_then(ToPrimitive::to_f64),
            category_name: row.category_name,
            image_url: row.image_url,
            is_available: row.is_available,
            is_quick_snack: row.is_quick_snack,
        }
    }
}

/// Wraps `text` as an `ILIKE` substring pattern, escaping wildcards.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Loads active shops matching `query`, each with its available menu items.
///
/// Shops come back in creation order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn fetch_shops(pool: &PgPool, query: &ShopQuery) -> Result<Vec<ShopRecord>, DbError> {
    let text = query
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(contains_pattern);
    let (min_lat, max_lat, min_lng, max_lng) = match query.within {
        Some(b) => (Some(b.min_lat), Some(b.max_lat), Some(b.min_lng), Some(b.max_lng)),
        None => (None, None, None, None),
    };

    let rows = sqlx::query_as::<_, ShopRow>(
        "SELECT \
             s.id, s.name, s.description, s.address, s.city, \
             s.latitude::float8 AS latitude, s.longitude::float8 AS longitude, \
             s.category_id, c.name AS category_name, s.logo_url, \
             s.avg_rating::float8 AS avg_rating, s.review_count::int8 AS review_count, \
             s.open_hours, s.phone_number \
         FROM shops s \
         LEFT JOIN main_categories c ON c.id = s.category_id \
         WHERE s.is_active = TRUE \
           AND ($1::UUID IS NULL OR s.category_id = $1) \
           AND ($2::UUID[] IS NULL OR s.id = ANY($2)) \
           AND ($3::TEXT IS NULL \
                OR s.name ILIKE $3 OR s.description ILIKE $3 \
                OR s.address ILIKE $3 OR s.city ILIKE $3 \
                OR EXISTS (SELECT 1 FROM menus m \
                           WHERE m.shop_id = s.id AND m.is_available = TRUE \
                             AND (m.item_name ILIKE $3 OR m.description ILIKE $3 \
                                  OR m.category_name ILIKE $3))) \
           AND (cardinality($4::TEXT[]) = 0 \
                OR EXISTS (SELECT 1 FROM menus m \
                           WHERE m.shop_id = s.id AND m.is_available = TRUE \
                             AND m.category_name = ANY($4))) \
           AND (NOT $5::BOOL \
                OR EXISTS (SELECT 1 FROM menus m \
                           WHERE m.shop_id = s.id AND m.is_available = TRUE)) \
           AND ($6::FLOAT8 IS NULL \
                OR (s.latitude::float8 BETWEEN $6 AND $7 \
                    AND s.longitude::float8 BETWEEN $8 AND $9)) \
         ORDER BY s.created_at, s.id",
    )
    .bind(query.category_id)
    .bind(query.ids.as_deref())
    .bind(text)
    .bind(&query.menu_categories)
    .bind(query.with_available_menu)
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lng)
    .bind(max_lng)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let shop_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let menus = sqlx::query_as::<_, MenuRow>(
        "SELECT id, shop_id, item_name, description, price, category_name, image_url, \
                is_available, is_quick_snack \
         FROM menus \
         WHERE shop_id = ANY($1) AND is_available = TRUE \
         ORDER BY created_at, id",
    )
    .bind(&shop_ids)
    .fetch_all(pool)
    .await?;

    let mut by_shop: HashMap<Uuid, Vec<MenuItem>> = HashMap::new();
    for row in menus {
        by_shop.entry(row.shop_id).or_default().push(row.into());
    }

    Ok(rows
        .into_iter()
        .map(|row| ShopRecord {
            menus: by_shop.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
            description: row.description,
            address: row.address,
            city: row.city,
            latitude: row.latitude,
            longitude: row.longitude,
            category: row
                .category_id
                .zip(row.category_name)
                .map(|(id, name)| CategoryRef { id, name }),
            logo_url: row.logo_url,
            avg_rating: row.avg_rating,
            review_count: row.review_count,
            open_hours: row.open_hours,
            phone_number: row.phone_number,
        })
        .collect())
}

/// Full shop row for detail pages, including inactive shops so callers can 404.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopDetailRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub logo_url: Option<String>,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
    pub open_hours: Option<String>,
    pub phone_number: Option<String>,
    pub website_url: Option<String>,
    pub chat_link: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shop_detail(pool: &PgPool, shop_id: Uuid) -> Result<Option<ShopDetailRow>, DbError> {
    let row = sqlx::query_as::<_, ShopDetailRow>(
        "SELECT \
             s.id, s.name, s.description, s.address, s.city, \
             s.latitude::float8 AS latitude, s.longitude::float8 AS longitude, \
             s.category_id, c.name AS category_name, s.logo_url, \
             s.avg_rating::float8 AS avg_rating, s.review_count::int8 AS review_count, \
             s.open_hours, s.phone_number, s.website_url, s.chat_link, \
             s.is_active, s.created_at \
         FROM shops s \
         LEFT JOIN main_categories c ON c.id = s.category_id \
         WHERE s.id = $1",
    )
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Available menu items of one shop, ordered by category then name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_detail_menus(pool: &PgPool, shop_id: Uuid) -> Result<Vec<MenuItem>, DbError> {
    let rows = sqlx::query_as::<_, MenuRow>(
        "SELECT id, shop_id, item_name, description, price, category_name, image_url, \
                is_available, is_quick_snack \
         FROM menus \
         WHERE shop_id = $1 AND is_available = TRUE \
         ORDER BY category_name NULLS LAST, item_name",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(MenuItem::from).collect())
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Newest approved reviews of a shop.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_reviews(
    pool: &PgPool,
    shop_id: Uuid,
    limit: i64,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, rating, comment, created_at \
         FROM reviews \
         WHERE shop_id = $1 AND is_approved = TRUE \
         ORDER BY created_at DESC \
         LIMIT $2",
    )
    .bind(shop_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopImageRow {
    pub id: Uuid,
    pub image_url: String,
    pub is_primary: bool,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shop_images(pool: &PgPool, shop_id: Uuid) -> Result<Vec<ShopImageRow>, DbError> {
    let rows = sqlx::query_as::<_, ShopImageRow>(
        "SELECT id, image_url, is_primary \
         FROM shop_images \
         WHERE shop_id = $1 \
         ORDER BY is_primary DESC, created_at",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
