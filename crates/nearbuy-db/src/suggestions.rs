//! Name lookups behind search type-ahead.

use nearbuy_core::suggest::{CATEGORY_LIMIT, MENU_ITEM_LIMIT, SHOP_LIMIT};
use nearbuy_core::{Suggestion, SuggestionKind};
use sqlx::PgPool;
use uuid::Uuid;

use crate::shops::contains_pattern;
use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct NameMatchRow {
    id: Uuid,
    name: String,
    shop_id: Option<Uuid>,
}

fn into_suggestions(rows: Vec<NameMatchRow>, kind: SuggestionKind) -> Vec<Suggestion> {
    rows.into_iter()
        .map(|row| Suggestion {
            id: row.id,
            name: row.name,
            kind,
            shop_id: row.shop_id,
        })
        .collect()
}

/// Active shops whose name, description, address or city contains `term`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn shop_suggestions(pool: &PgPool, term: &str) -> Result<Vec<Suggestion>, DbError> {
    let rows = sqlx::query_as::<_, NameMatchRow>(
        "SELECT id, name, NULL::UUID AS shop_id \
         FROM shops \
         WHERE is_active = TRUE \
           AND (name ILIKE $1 OR description ILIKE $1 OR address ILIKE $1 OR city ILIKE $1) \
         ORDER BY name \
         LIMIT $2",
    )
    .bind(contains_pattern(term))
    .bind(SHOP_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(into_suggestions(rows, SuggestionKind::Shop))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_suggestions(pool: &PgPool, term: &str) -> Result<Vec<Suggestion>, DbError> {
    let rows = sqlx::query_as::<_, NameMatchRow>(
        "SELECT id, name, NULL::UUID AS shop_id \
         FROM main_categories \
         WHERE is_active = TRUE AND name ILIKE $1 \
         ORDER BY name \
         LIMIT $2",
    )
    .bind(contains_pattern(term))
    .bind(CATEGORY_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(into_suggestions(rows, SuggestionKind::Category))
}

/// Available menu items matching on name, description or category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn menu_item_suggestions(pool: &PgPool, term: &str) -> Result<Vec<Suggestion>, DbError> {
    let rows = sqlx::query_as::<_, NameMatchRow>(
        "SELECT m.id, m.item_name AS name, m.shop_id \
         FROM menus m \
         JOIN shops s ON s.id = m.shop_id \
         WHERE m.is_available = TRUE AND s.is_active = TRUE \
           AND (m.item_name ILIKE $1 OR m.description ILIKE $1 OR m.category_name ILIKE $1) \
         ORDER BY m.item_name \
         LIMIT $2",
    )
    .bind(contains_pattern(term))
    .bind(MENU_ITEM_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(into_suggestions(rows, SuggestionKind::MenuItem))
}
