//! Suggestion sections and their items.

use std::collections::HashMap;

use nearbuy_core::SectionDefinition;
use sqlx::PgPool;
use uuid::Uuid;

use crate::categories::get_category_id_by_name;
use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SectionRow {
    pub id: Uuid,
    pub key: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    /// Behaviour name as stored; parsed by the caller.
    pub kind: String,
    pub main_category_id: Option<Uuid>,
    pub main_category_name: Option<String>,
    pub main_category_image_url: Option<String>,
    pub config: serde_json::Value,
    pub sort_order: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SectionItemRow {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub shop_id: Option<Uuid>,
    pub main_category_id: Option<Uuid>,
}

const SECTION_COLUMNS: &str = "s.id, s.key, s.title, s.subtitle, s.image_url, s.type AS kind, \
     s.main_category_id, c.name AS main_category_name, c.image_url AS main_category_image_url, \
     s.config, s.sort_order";

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_sections(pool: &PgPool) -> Result<Vec<SectionRow>, DbError> {
    let rows = sqlx::query_as::<_, SectionRow>(&format!(
        "SELECT {SECTION_COLUMNS} \
         FROM suggestion_sections s \
         LEFT JOIN main_categories c ON c.id = s.main_category_id \
         WHERE s.is_active = TRUE \
         ORDER BY s.sort_order, s.key"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns `None` for unknown and inactive sections alike.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_active_section(pool: &PgPool, id: Uuid) -> Result<Option<SectionRow>, DbError> {
    let row = sqlx::query_as::<_, SectionRow>(&format!(
        "SELECT {SECTION_COLUMNS} \
         FROM suggestion_sections s \
         LEFT JOIN main_categories c ON c.id = s.main_category_id \
         WHERE s.id = $1 AND s.is_active = TRUE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Active items of the given sections, grouped by section in display order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_section_items(
    pool: &PgPool,
    section_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<SectionItemRow>>, DbError> {
    let rows = sqlx::query_as::<_, SectionItemRow>(
        "SELECT id, section_id, title, subtitle, image_url, shop_id, main_category_id \
         FROM suggestion_items \
         WHERE section_id = ANY($1) AND is_active = TRUE \
         ORDER BY sort_order, id",
    )
    .bind(section_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<SectionItemRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.section_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Upserts section definitions by key and replaces their items.
///
/// Main categories are resolved by name before any write. All writes run in
/// one transaction; if any fails the batch is rolled back. Returns the number
/// of sections written.
///
/// # Errors
///
/// Returns [`DbError::UnknownCategory`] when a named main category does not
/// exist, or [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_sections(pool: &PgPool, sections: &[SectionDefinition]) -> Result<usize, DbError> {
    let mut category_ids = Vec::with_capacity(sections.len());
    for section in sections {
        let id = match section.main_category.as_deref() {
            Some(name) => Some(
                get_category_id_by_name(pool, name)
                    .await?
                    .ok_or_else(|| DbError::UnknownCategory(name.to_string()))?,
            ),
            None => None,
        };
        category_ids.push(id);
    }

    let mut tx = pool.begin().await?;

    for (section, main_category_id) in sections.iter().zip(category_ids) {
        let section_id: Uuid = sqlx::query_scalar(
            "INSERT INTO suggestion_sections \
               (key, title, subtitle, image_url, type, main_category_id, config, sort_order, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (key) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 subtitle = EXCLUDED.subtitle, \
                 image_url = EXCLUDED.image_url, \
                 type = EXCLUDED.type, \
                 main_category_id = EXCLUDED.main_category_id, \
                 config = EXCLUDED.config, \
                 sort_order = EXCLUDED.sort_order, \
                 is_active = EXCLUDED.is_active, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&section.key)
        .bind(&section.title)
        .bind(&section.subtitle)
        .bind(&section.image_url)
        .bind(&section.kind)
        .bind(main_category_id)
        .bind(if section.config.is_null() {
            serde_json::json!({})
        } else {
            section.config.clone()
        })
        .bind(section.sort_order)
        .bind(section.active)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM suggestion_items WHERE section_id = $1")
            .bind(section_id)
            .execute(&mut *tx)
            .await?;

        for (position, item) in (0_i32..).zip(&section.items) {
            sqlx::query(
                "INSERT INTO suggestion_items (section_id, title, subtitle, image_url, sort_order) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(section_id)
            .bind(&item.title)
            .bind(&item.subtitle)
            .bind(&item.image_url)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(sections.len())
}
