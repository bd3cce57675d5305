use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use nearbuy_core::geo::{GeoPoint, Precision};
use nearbuy_core::ranking::parse_origin;
use nearbuy_core::BoundingBox;
use nearbuy_db::{CategoryPointRow, CategoryRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_criteria_error, map_db_error, ApiError, AppState};

/// Used when the `search_radius_km` setting is absent or unusable.
const CATEGORY_DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Deserialize)]
pub(super) struct CategoriesQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CategoryItem {
    id: Uuid,
    name: String,
    image_url: Option<String>,
}

impl From<CategoryRow> for CategoryItem {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
        }
    }
}

/// Keeps categories with at least one shop point within `radius_km` of
/// `origin`, once each, in row order.
pub(super) fn categories_within(
    rows: Vec<CategoryPointRow>,
    origin: GeoPoint,
    radius_km: f64,
) -> Vec<CategoryItem> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            origin.distance_to(GeoPoint::new(row.latitude, row.longitude), Precision::Exact)
                <= radius_km
        })
        .filter(|row| seen.insert(row.id))
        .map(|row| CategoryItem {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
        })
        .collect()
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CategoriesQuery>,
) -> Result<Json<Vec<CategoryItem>>, ApiError> {
    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;

    let Some(origin) = origin else {
        let rows = nearbuy_db::list_active_categories(&state.pool)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        return Ok(Json(rows.into_iter().map(CategoryItem::from).collect()));
    };

    let radius_km = nearbuy_db::search_radius_km(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .unwrap_or(CATEGORY_DEFAULT_RADIUS_KM);
    let rows = nearbuy_db::list_categories_near(&state.pool, BoundingBox::around(origin, radius_km))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        request_id = %req_id.0,
        radius_km,
        candidates = rows.len(),
        "filtering categories by location"
    );

    Ok(Json(categories_within(rows, origin, radius_km)))
}
