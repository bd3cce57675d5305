//! Shop search, type-ahead suggestions and the search-result detail page.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nearbuy_core::card::{category_images, CategoryImage};
use nearbuy_core::hours::OpenHours;
use nearbuy_core::ranking::{parse_min_rating, parse_number, parse_origin, parse_radius};
use nearbuy_core::suggest::normalize_query;
use nearbuy_core::{
    distance_km, merge_suggestions, rank, BoundingBox, CategoryRef, CriteriaError, FilterCriteria,
    GeoPoint, HoursFilter, MenuItem, Precision, PriceRange, RadiusFallback, ShopCard, ShopQuery,
    SortKey, Suggestion,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    local_time_now, map_criteria_error, map_db_error, parse_count, parse_path_id, parse_user_id,
    ApiError, AppState,
};

/// Reviews shown on the search-result detail page.
const DETAIL_REVIEW_LIMIT: i64 = 10;
/// Menu section for items without a category.
const OTHERS_SECTION: &str = "Others";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchShopsQuery {
    pub query: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub sort_by: Option<String>,
    pub category_id: Option<String>,
    pub user_id: Option<String>,
    pub chip: Option<String>,
    pub hours_filter: Option<String>,
    pub custom_open_from: Option<String>,
    pub custom_open_to: Option<String>,
    pub min_rating: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchFilters {
    hours_filter: &'static str,
    custom_open_from: Option<String>,
    custom_open_to: Option<String>,
    min_rating: f64,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchShopsResponse {
    query: String,
    chip: String,
    all_menu_categories: Vec<CategoryImage>,
    total_results: usize,
    search_radius: f64,
    sort_by: &'static str,
    filters: SearchFilters,
    user_location: Option<GeoPoint>,
    shops: Vec<ShopCard>,
}

/// Lowercased chip, with blank and `All` meaning no chip.
fn parse_chip(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase)
}

fn parse_sort(raw: Option<&str>) -> Result<SortKey, CriteriaError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(SortKey::default()),
        Some(s) => s.parse(),
    }
}

fn parse_category_id(request_id: &str, raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => Uuid::parse_str(v)
            .map(Some)
            .map_err(|_| ApiError::validation(request_id, "categoryId must be a UUID")),
    }
}

/// Turns the query string into ranking criteria. `default_radius` and
/// `fallback` come from configuration.
pub(super) fn search_criteria(
    query: &SearchShopsQuery,
    default_radius: f64,
    fallback: RadiusFallback,
) -> Result<FilterCriteria, CriteriaError> {
    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())?;
    let radius = parse_radius(query.radius.as_deref(), default_radius)?;

    Ok(FilterCriteria {
        origin,
        radius_km: Some(radius),
        min_rating: parse_min_rating(query.min_rating.as_deref())?,
        price: PriceRange {
            min: parse_number("minPrice", query.min_price.as_deref())?,
            max: parse_number("maxPrice", query.max_price.as_deref())?,
        },
        hours: HoursFilter::parse(
            query.hours_filter.as_deref(),
            query.custom_open_from.as_deref(),
            query.custom_open_to.as_deref(),
        )?,
        chip: parse_chip(query.chip.as_deref()),
        sort: parse_sort(query.sort_by.as_deref())?,
        fallback: Some(fallback),
        limit: parse_count("limit", query.limit.as_deref())?,
        offset: parse_count("offset", query.offset.as_deref())?.unwrap_or(0),
    })
}

pub(super) async fn search_shops(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchShopsQuery>,
) -> Result<Json<SearchShopsResponse>, ApiError> {
    let term = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::validation(req_id.0.clone(), "query is required"))?
        .to_string();

    let fallback = RadiusFallback {
        min_results: state.config.fallback_min_results,
        radius_km: state.config.fallback_radius_km,
    };
    let criteria = search_criteria(&query, state.config.default_search_radius_km, fallback)
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;
    let category_id = parse_category_id(&req_id.0, query.category_id.as_deref())?;
    let user_id = parse_user_id(&req_id.0, query.user_id.as_deref())?;

    let widest = criteria
        .radius_km
        .map_or(fallback.radius_km, |r| r.max(fallback.radius_km));
    let shop_query = ShopQuery {
        category_id,
        text: Some(term.clone()),
        within: criteria.origin.map(|o| BoundingBox::around(o, widest)),
        ..ShopQuery::default()
    };

    let saved = async {
        match user_id {
            Some(user) => nearbuy_db::saved_shop_ids(&state.pool, user).await,
            None => Ok(HashSet::new()),
        }
    };
    let (shops, saved) = tokio::try_join!(nearbuy_db::fetch_shops(&state.pool, &shop_query), saved)
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let ranked = rank(&shops, &criteria, local_time_now());
    let mut cards = ranked.cards;
    for card in &mut cards {
        card.is_saved = Some(saved.contains(&card.id));
    }

    tracing::debug!(
        request_id = %req_id.0,
        fetched = shops.len(),
        total = ranked.total,
        radius_km = ?ranked.effective_radius_km,
        "shop search ranked"
    );

    Ok(Json(SearchShopsResponse {
        query: term,
        chip: criteria.chip.clone().unwrap_or_else(|| "All".to_string()),
        all_menu_categories: category_images(&ranked.menu_categories, &shops),
        total_results: ranked.total,
        search_radius: ranked
            .effective_radius_km
            .or(criteria.radius_km)
            .unwrap_or(state.config.default_search_radius_km),
        sort_by: criteria.sort.as_str(),
        filters: SearchFilters {
            hours_filter: criteria.hours.as_str(),
            custom_open_from: query.custom_open_from,
            custom_open_to: query.custom_open_to,
            min_rating: criteria.min_rating.unwrap_or(0.0),
            min_price: criteria.price.min,
            max_price: criteria.price.max,
        },
        user_location: criteria.origin,
        shops: cards,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct SuggestionsQuery {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SuggestionsResponse {
    query: String,
    suggestions: Vec<Suggestion>,
}

pub(super) async fn search_suggestions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let Some(term) = normalize_query(query.query.as_deref()) else {
        return Ok(Json(SuggestionsResponse {
            query: query.query.unwrap_or_default(),
            suggestions: Vec::new(),
        }));
    };

    let (shops, categories, menu_items) = tokio::try_join!(
        nearbuy_db::shop_suggestions(&state.pool, term),
        nearbuy_db::category_suggestions(&state.pool, term),
        nearbuy_db::menu_item_suggestions(&state.pool, term),
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(SuggestionsResponse {
        query: term.to_string(),
        suggestions: merge_suggestions(shops, categories, menu_items),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewItem {
    id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(super) struct MenuSection {
    pub category_name: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ShopSearchDetail {
    id: Uuid,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    address: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    distance_km: Option<f64>,
    category: Option<CategoryRef>,
    rating: f64,
    reviews_count: i64,
    reviews: Vec<ReviewItem>,
    open_hours: Option<String>,
    is_open_now: Option<bool>,
    contact_number: Option<String>,
    menu_sections: Vec<MenuSection>,
}

/// Groups items by category in first-seen order; uncategorised items go to `Others`.
pub(super) fn group_menu_sections(items: Vec<MenuItem>) -> Vec<MenuSection> {
    let mut sections: Vec<MenuSection> = Vec::new();
    for item in items {
        let name = item.category().unwrap_or(OTHERS_SECTION).to_string();
        match sections.iter_mut().find(|s| s.category_name == name) {
            Some(section) => section.items.push(item),
            None => sections.push(MenuSection {
                category_name: name,
                items: vec![item],
            }),
        }
    }
    sections
}

pub(super) async fn get_shop_search_detail(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<ShopSearchDetail>, ApiError> {
    let shop_id = parse_path_id(&req_id.0, &id, "shop")?;
    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;

    let shop = nearbuy_db::get_shop_detail(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .filter(|s| s.is_active)
        .ok_or_else(|| ApiError::not_found(req_id.0.clone(), "shop"))?;

    let (menus, reviews) = tokio::try_join!(
        nearbuy_db::list_detail_menus(&state.pool, shop_id),
        nearbuy_db::list_recent_reviews(&state.pool, shop_id, DETAIL_REVIEW_LIMIT),
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let distance_km = distance_km(
        origin.map(|o| o.lat),
        origin.map(|o| o.lng),
        shop.latitude,
        shop.longitude,
        Precision::Hundredths,
    );
    let is_open_now = shop
        .open_hours
        .as_deref()
        .and_then(OpenHours::parse)
        .map(|h| h.is_open_at(local_time_now()));

    Ok(Json(ShopSearchDetail {
        id: shop.id,
        name: shop.name,
        description: shop.description,
        image_url: shop.logo_url,
        address: shop.address,
        city: shop.city,
        latitude: shop.latitude,
        longitude: shop.longitude,
        distance_km,
        category: shop
            .category_id
            .zip(shop.category_name)
            .map(|(id, name)| CategoryRef { id, name }),
        rating: shop.avg_rating.unwrap_or(0.0),
        reviews_count: shop.review_count,
        reviews: reviews
            .into_iter()
            .map(|r| ReviewItem {
                id: r.id,
                rating: r.rating,
                comment: r.comment,
                created_at: r.created_at,
            })
            .collect(),
        open_hours: shop.open_hours,
        is_open_now,
        contact_number: shop.phone_number,
        menu_sections: group_menu_sections(menus),
    }))
}
