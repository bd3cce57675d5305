//! Saved places, grouped by shop category.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nearbuy_core::geo::{format_distance, round_distance_for_display};
use nearbuy_core::ranking::{parse_origin, parse_radius};
use nearbuy_core::{rank, CriteriaError, FilterCriteria, ShopCard, ShopQuery, ShopRecord, SortKey};
use nearbuy_db::{OfferRow, ReviewAggregateRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    local_time_now, map_criteria_error, map_db_error, parse_count, require_user_id, ApiError,
    AppState,
};

const SAVED_DEFAULT_RADIUS_KM: f64 = 7.0;
const SAVED_DEFAULT_LIMIT: usize = 100;
const SAVED_MAX_LIMIT: usize = 500;
const OFFERS_PER_SHOP: i64 = 5;
const UNCATEGORIZED_ID: &str = "uncategorized";
const UNCATEGORIZED_NAME: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SavedSort {
    Distance,
    Rating,
    Recent,
}

impl SavedSort {
    fn parse(raw: Option<&str>) -> Result<Self, CriteriaError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("distance") => Ok(SavedSort::Distance),
            Some("rating") => Ok(SavedSort::Rating),
            Some("recent") => Ok(SavedSort::Recent),
            Some(_) => Err(CriteriaError::UnknownValue {
                field: "sortBy",
                expected: "distance, rating, recent",
            }),
        }
    }

    /// Saved rows arrive newest first, so `recent` keeps upstream order.
    fn sort_key(self) -> SortKey {
        match self {
            SavedSort::Distance => SortKey::Distance,
            SavedSort::Rating => SortKey::Rating,
            SavedSort::Recent => SortKey::Relevance,
        }
    }
}

fn parse_limit(raw: Option<&str>) -> Result<usize, CriteriaError> {
    let limit = parse_count("limit", raw)?.unwrap_or(SAVED_DEFAULT_LIMIT);
    if (1..=SAVED_MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(CriteriaError::OutOfRange {
            field: "limit",
            reason: "must be between 1 and 500",
        })
    }
}

fn parse_flag(field: &'static str, raw: Option<&str>) -> Result<bool, CriteriaError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(_) => Err(CriteriaError::UnknownValue {
            field,
            expected: "true, false",
        }),
    }
}

/// Rating clamped to 0..=5 and rounded to the nearest half star.
pub(super) fn round_to_half(rating: f64) -> f64 {
    (rating.clamp(0.0, 5.0) * 2.0).round() / 2.0
}

/// Always one decimal, so whole ratings read `4.0`.
pub(super) fn rating_display(rating_number: f64) -> String {
    format!("{rating_number:.1}")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(super) fn rating_percent(rating: f64) -> u8 {
    (rating.clamp(0.0, 5.0) / 5.0 * 100.0).round() as u8
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SavedPlacesQuery {
    pub user_id: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub filter_by_radius: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OfferItem {
    id: Uuid,
    title: String,
    description: Option<String>,
    terms: Option<String>,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
}

impl From<OfferRow> for OfferItem {
    fn from(row: OfferRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            terms: row.terms,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct SavedCategory {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SavedPlace {
    id: Uuid,
    name: String,
    description: Option<String>,
    address: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    image_url: Option<String>,
    open_hours: Option<String>,
    phone_number: Option<String>,
    rating_number: f64,
    rating_display: String,
    rating_percent: u8,
    reviews_count: i64,
    min_price: Option<f64>,
    max_price: Option<f64>,
    offers: Vec<OfferItem>,
    category: SavedCategory,
    distance_km: Option<f64>,
    distance_display: Option<String>,
    distance_km_rounded: Option<f64>,
    is_saved: bool,
    saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct SavedCategoryGroup {
    category: SavedCategory,
    shops: Vec<SavedPlace>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SavedPlacesResponse {
    total_saved: usize,
    returned_count: usize,
    categories: Vec<SavedCategoryGroup>,
}

/// Puts `shops` in `saved_order` and swaps the stored rating for the
/// approved-review aggregate. Shops without approved reviews rate 0.
fn apply_review_aggregates(
    shops: Vec<ShopRecord>,
    saved_order: &[Uuid],
    aggregates: &[ReviewAggregateRow],
) -> Vec<ShopRecord> {
    let mut by_id: HashMap<Uuid, ShopRecord> = shops.into_iter().map(|s| (s.id, s)).collect();
    let aggregates: HashMap<Uuid, &ReviewAggregateRow> =
        aggregates.iter().map(|a| (a.shop_id, a)).collect();

    saved_order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .map(|mut shop| {
            let aggregate = aggregates.get(&shop.id);
            shop.avg_rating = Some(
                aggregate
                    .and_then(|a| a.avg_rating)
                    .map_or(0.0, |r| (r.clamp(0.0, 5.0) * 100.0).round() / 100.0),
            );
            shop.review_count = Some(aggregate.map_or(0, |a| a.reviews_count));
            shop
        })
        .collect()
}

/// Groups places by category in first-seen order.
fn group_by_category(places: Vec<SavedPlace>) -> Vec<SavedCategoryGroup> {
    let mut groups: Vec<SavedCategoryGroup> = Vec::new();
    for place in places {
        match groups.iter_mut().find(|g| g.category == place.category) {
            Some(group) => group.shops.push(place),
            None => groups.push(SavedCategoryGroup {
                category: place.category.clone(),
                shops: vec![place],
            }),
        }
    }
    groups
}

pub(super) async fn list_saved_places(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SavedPlacesQuery>,
) -> Result<Json<SavedPlacesResponse>, ApiError> {
    let user_id = require_user_id(&req_id.0, query.user_id.as_deref())?;
    let invalid = |e: CriteriaError| map_criteria_error(req_id.0.clone(), &e);
    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref()).map_err(invalid)?;
    let radius = parse_radius(query.radius.as_deref(), SAVED_DEFAULT_RADIUS_KM).map_err(invalid)?;
    let limit = parse_limit(query.limit.as_deref()).map_err(invalid)?;
    let sort = SavedSort::parse(query.sort_by.as_deref()).map_err(invalid)?;
    let filter_by_radius =
        parse_flag("filterByRadius", query.filter_by_radius.as_deref()).map_err(invalid)?;

    let saved_rows = nearbuy_db::list_saved_shops(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if saved_rows.is_empty() {
        return Ok(Json(SavedPlacesResponse {
            total_saved: 0,
            returned_count: 0,
            categories: Vec::new(),
        }));
    }

    let saved_ids: Vec<Uuid> = saved_rows.iter().map(|r| r.shop_id).collect();
    let saved_at: HashMap<Uuid, DateTime<Utc>> =
        saved_rows.iter().map(|r| (r.shop_id, r.saved_at)).collect();
    let shop_query = ShopQuery {
        ids: Some(saved_ids.clone()),
        ..ShopQuery::default()
    };

    let (shops, aggregates, images, offers) = tokio::try_join!(
        nearbuy_db::fetch_shops(&state.pool, &shop_query),
        nearbuy_db::list_review_aggregates(&state.pool, &saved_ids),
        nearbuy_db::list_primary_images(&state.pool, &saved_ids),
        nearbuy_db::list_active_offers(&state.pool, &saved_ids, OFFERS_PER_SHOP),
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let shops = apply_review_aggregates(shops, &saved_ids, &aggregates);
    let criteria = FilterCriteria {
        origin,
        radius_km: filter_by_radius.then_some(radius),
        sort: sort.sort_key(),
        limit: Some(limit),
        ..FilterCriteria::default()
    };
    let ranked = rank(&shops, &criteria, local_time_now());

    let images: HashMap<Uuid, String> = images
        .into_iter()
        .map(|row| (row.shop_id, row.image_url))
        .collect();
    let mut offers_by_shop: HashMap<Uuid, Vec<OfferItem>> = HashMap::new();
    for offer in offers {
        offers_by_shop
            .entry(offer.shop_id)
            .or_default()
            .push(offer.into());
    }

    let places: Vec<SavedPlace> = ranked
        .cards
        .into_iter()
        .map(|card| {
            let image_url = images.get(&card.id).cloned().or_else(|| card.image_url.clone());
            let offers = offers_by_shop.remove(&card.id).unwrap_or_default();
            let saved_at = saved_at.get(&card.id).copied();
            saved_place(card, image_url, offers, saved_at)
        })
        .collect();

    Ok(Json(SavedPlacesResponse {
        total_saved: saved_rows.len(),
        returned_count: places.len(),
        categories: group_by_category(places),
    }))
}

fn saved_place(
    card: ShopCard,
    image_url: Option<String>,
    offers: Vec<OfferItem>,
    saved_at: Option<DateTime<Utc>>,
) -> SavedPlace {
    let rating_number = round_to_half(card.rating);
    SavedPlace {
        id: card.id,
        name: card.name,
        description: card.description,
        address: card.address,
        city: card.city,
        latitude: card.latitude,
        longitude: card.longitude,
        image_url,
        open_hours: card.open_hours,
        phone_number: card.contact_number,
        rating_number,
        rating_display: rating_display(rating_number),
        rating_percent: rating_percent(card.rating),
        reviews_count: card.reviews_count,
        min_price: card.min_price,
        max_price: card.max_price,
        offers,
        category: card.category.map_or_else(
            || SavedCategory {
                id: UNCATEGORIZED_ID.to_string(),
                name: UNCATEGORIZED_NAME.to_string(),
            },
            |c| SavedCategory {
                id: c.id.to_string(),
                name: c.name,
            },
        ),
        distance_km: card.distance_km,
        distance_display: card.distance_km.and_then(format_distance),
        distance_km_rounded: card.distance_km.and_then(round_distance_for_display),
        is_saved: true,
        saved_at,
    }
}
