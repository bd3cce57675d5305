//! Home-screen suggestion sections and the shops each one produces.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use nearbuy_core::behaviour::{
    quick_snack_categories, quick_snack_category_query, MenuCategoryCount,
};
use nearbuy_core::ranking::{parse_origin, parse_radius};
use nearbuy_core::{
    BehaviourConfig, BehaviourContext, BehaviourKind, SectionSpec, ShopCard,
};
use nearbuy_db::{PgShopSource, SectionItemRow, SectionRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    local_time_now, map_behaviour_error, map_criteria_error, map_db_error, parse_path_id,
    parse_user_id, ApiError, AppState,
};

/// Section radius when neither the request nor the section config sets one.
const SECTION_DEFAULT_RADIUS_KM: f64 = 7.0;
const QUICK_SNACK_DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MainCategoryItem {
    id: Uuid,
    name: String,
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SectionItem {
    id: Uuid,
    title: String,
    subtitle: Option<String>,
    image_url: Option<String>,
    shop_id: Option<Uuid>,
    main_category_id: Option<Uuid>,
}

impl From<SectionItemRow> for SectionItem {
    fn from(row: SectionItemRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            subtitle: row.subtitle,
            image_url: row.image_url,
            shop_id: row.shop_id,
            main_category_id: row.main_category_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SectionSummary {
    id: Uuid,
    key: String,
    title: String,
    subtitle: Option<String>,
    image_url: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    main_category: Option<MainCategoryItem>,
    config: serde_json::Value,
    items: Vec<SectionItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SectionsResponse {
    sections: Vec<SectionSummary>,
}

pub(super) async fn list_sections(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<SectionsResponse>, ApiError> {
    let rows = nearbuy_db::list_active_sections(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = nearbuy_db::list_active_section_items(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let sections = rows
        .into_iter()
        .map(|row| SectionSummary {
            items: items
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(SectionItem::from)
                .collect(),
            main_category: row
                .main_category_id
                .zip(row.main_category_name)
                .map(|(id, name)| MainCategoryItem {
                    id,
                    name,
                    image_url: row.main_category_image_url,
                }),
            id: row.id,
            key: row.key,
            title: row.title,
            subtitle: row.subtitle,
            image_url: row.image_url,
            kind: row.kind,
            config: row.config,
        })
        .collect();

    Ok(Json(SectionsResponse { sections }))
}

async fn load_section(state: &AppState, req_id: &str, raw_id: &str) -> Result<SectionRow, ApiError> {
    let section_id = parse_path_id(req_id, raw_id, "suggestion section")?;
    nearbuy_db::get_active_section(&state.pool, section_id)
        .await
        .map_err(|e| map_db_error(req_id.to_string(), &e))?
        .ok_or_else(|| ApiError::not_found(req_id, "suggestion section"))
}

fn section_spec(req_id: &str, row: &SectionRow) -> Result<SectionSpec, ApiError> {
    SectionSpec::from_parts(
        row.id,
        row.title.clone(),
        &row.kind,
        row.main_category_id,
        &row.config,
    )
    .map_err(|e| {
        tracing::warn!(section_id = %row.id, behaviour = %row.kind, error = %e, "unusable section");
        map_behaviour_error(req_id.to_string(), &e)
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SectionShopsQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub user_id: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SectionRef {
    id: Uuid,
    title: String,
    #[serde(rename = "type")]
    kind: BehaviourKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SectionShopsResponse {
    section: SectionRef,
    total_results: usize,
    shops: Vec<ShopCard>,
}

pub(super) async fn list_section_shops(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(section_id): Path<String>,
    Query(query): Query<SectionShopsQuery>,
) -> Result<Json<SectionShopsResponse>, ApiError> {
    let row = load_section(&state, &req_id.0, &section_id).await?;
    let spec = section_spec(&req_id.0, &row)?;

    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;
    let radius_km = parse_radius(
        query.radius.as_deref(),
        spec.config
            .max_distance_km()
            .unwrap_or(SECTION_DEFAULT_RADIUS_KM),
    )
    .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;
    let user_id = parse_user_id(&req_id.0, query.user_id.as_deref())?;

    let ctx = BehaviourContext {
        origin,
        radius_km,
        category: query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty()),
        now: local_time_now(),
    };

    let mut shops = state
        .registry
        .dispatch(&PgShopSource::new(&state.pool), &spec, &ctx)
        .await
        .map_err(|e| map_behaviour_error(req_id.0.clone(), &e))?;

    if let Some(user) = user_id {
        let saved = nearbuy_db::saved_shop_ids(&state.pool, user)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        for shop in &mut shops {
            shop.is_saved = Some(saved.contains(&shop.id));
        }
    }

    Ok(Json(SectionShopsResponse {
        section: SectionRef {
            id: spec.id,
            kind: spec.kind(),
            title: spec.title,
        },
        total_results: shops.len(),
        shops,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct QuickSnackQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QuickSnackCategoriesResponse {
    section_id: Uuid,
    title: String,
    categories: Vec<MenuCategoryCount>,
}

pub(super) async fn list_quick_snack_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(section_id): Path<String>,
    Query(query): Query<QuickSnackQuery>,
) -> Result<Json<QuickSnackCategoriesResponse>, ApiError> {
    let row = load_section(&state, &req_id.0, &section_id).await?;
    if row.kind != BehaviourKind::QuickSnack.as_str() {
        return Err(ApiError::not_found(req_id.0.clone(), "quick snack section"));
    }
    let spec = section_spec(&req_id.0, &row)?;
    let BehaviourConfig::QuickSnack(config) = &spec.config else {
        return Err(ApiError::not_found(req_id.0.clone(), "quick snack section"));
    };

    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;
    let radius_km = parse_radius(
        query.radius.as_deref(),
        config
            .max_distance_km
            .unwrap_or(QUICK_SNACK_DEFAULT_RADIUS_KM),
    )
    .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;

    let shops = nearbuy_db::fetch_shops(&state.pool, &quick_snack_category_query(config))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(QuickSnackCategoriesResponse {
        section_id: spec.id,
        categories: quick_snack_categories(&shops, config, origin, radius_km),
        title: spec.title.clone(),
    }))
}
