//! Category shop listings and the shop details page.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nearbuy_core::geo::{distance_km, GeoPoint, Precision};
use nearbuy_core::ranking::parse_origin;
use nearbuy_db::{CategoryShopRow, OfferRow, ShopDetailRow, ShopImageRow};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_criteria_error, map_db_error, parse_path_id, parse_user_id, ApiError, AppState,
};

/// Shops of a category are listed only this close to the caller.
const CATEGORY_SHOP_RADIUS_KM: f64 = 3.0;
const DETAIL_OFFER_LIMIT: i64 = 50;
const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1&destination=";

/// Characters left alone by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CategoryShopsQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CategoryShopItem {
    id: Uuid,
    name: String,
    logo_url: Option<String>,
    address: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    avg_rating: f64,
    review_count: i64,
    distance: f64,
    distance_text: String,
    is_saved: bool,
}

/// Shops within [`CATEGORY_SHOP_RADIUS_KM`] of `origin`, nearest first.
/// Shops without coordinates are dropped.
pub(super) fn nearby_category_shops(
    rows: Vec<CategoryShopRow>,
    origin: GeoPoint,
    is_saved: impl Fn(Uuid) -> bool,
) -> Vec<CategoryShopItem> {
    let mut items: Vec<CategoryShopItem> = rows
        .into_iter()
        .filter_map(|row| {
            let distance = distance_km(
                Some(origin.lat),
                Some(origin.lng),
                row.latitude,
                row.longitude,
                Precision::Exact,
            )?;
            (distance <= CATEGORY_SHOP_RADIUS_KM).then(|| CategoryShopItem {
                is_saved: is_saved(row.id),
                id: row.id,
                name: row.name,
                logo_url: row.logo_url,
                address: row.address,
                city: row.city,
                latitude: row.latitude,
                longitude: row.longitude,
                avg_rating: row.avg_rating.unwrap_or(0.0),
                review_count: row.review_count,
                distance,
                distance_text: format!("{distance:.1} km"),
            })
        })
        .collect();
    items.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    items
}

pub(super) async fn list_shops_by_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category_id): Path<String>,
    Query(query): Query<CategoryShopsQuery>,
) -> Result<Json<Vec<CategoryShopItem>>, ApiError> {
    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::validation(req_id.0.clone(), "lat and lng are required"))?;
    let user_id = parse_user_id(&req_id.0, query.user_id.as_deref())?;
    let category_id = parse_path_id(&req_id.0, &category_id, "category")?;

    let saved = async {
        match user_id {
            Some(user) => nearbuy_db::saved_shop_ids(&state.pool, user).await,
            None => Ok(Default::default()),
        }
    };
    let (rows, saved) = tokio::try_join!(
        nearbuy_db::list_category_shops(&state.pool, category_id),
        saved,
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(nearby_category_shops(rows, origin, |id| {
        saved.contains(&id)
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct DetailsQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct ShopLinks {
    direction: Option<String>,
    chat: Option<String>,
    call: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImageItem {
    id: Uuid,
    image_url: String,
}

impl From<ShopImageRow> for ImageItem {
    fn from(row: ShopImageRow) -> Self {
        Self {
            id: row.id,
            image_url: row.image_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DetailOffer {
    id: Uuid,
    title: String,
    description: Option<String>,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    terms: Option<String>,
}

impl From<OfferRow> for DetailOffer {
    fn from(row: OfferRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            terms: row.terms,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ShopDetails {
    id: Uuid,
    name: String,
    logo_url: Option<String>,
    address: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    phone_number: Option<String>,
    website_url: Option<String>,
    chat_link: Option<String>,
    open_hours: Option<String>,
    description: Option<String>,
    avg_rating: f64,
    review_count: i64,
    distance: Option<f64>,
    distance_text: Option<String>,
    links: ShopLinks,
    images: Vec<ImageItem>,
    offers: Vec<DetailOffer>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(super) fn shop_links(shop: &ShopDetailRow) -> ShopLinks {
    let direction = GeoPoint::from_parts(shop.latitude, shop.longitude).map(|p| {
        format!(
            "{DIRECTIONS_BASE_URL}{},{}",
            utf8_percent_encode(&p.lat.to_string(), COMPONENT),
            utf8_percent_encode(&p.lng.to_string(), COMPONENT),
        )
    });
    ShopLinks {
        direction,
        chat: non_blank(shop.chat_link.as_deref()),
        call: non_blank(shop.phone_number.as_deref()).map(|phone| format!("tel:{phone}")),
        website: non_blank(shop.website_url.as_deref()),
    }
}

pub(super) async fn get_shop_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(shop_id): Path<String>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<ShopDetails>, ApiError> {
    let shop_id = parse_path_id(&req_id.0, &shop_id, "shop")?;
    let origin = parse_origin(query.lat.as_deref(), query.lng.as_deref())
        .map_err(|e| map_criteria_error(req_id.0.clone(), &e))?;

    let shop = nearbuy_db::get_shop_detail(&state.pool, shop_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .filter(|shop| shop.is_active)
        .ok_or_else(|| ApiError::not_found(req_id.0.clone(), "shop"))?;

    let shop_ids = [shop_id];
    let (images, offers) = tokio::try_join!(
        nearbuy_db::list_shop_images(&state.pool, shop_id),
        nearbuy_db::list_active_offers(&state.pool, &shop_ids, DETAIL_OFFER_LIMIT),
    )
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let distance = distance_km(
        origin.map(|o| o.lat),
        origin.map(|o| o.lng),
        shop.latitude,
        shop.longitude,
        Precision::Hundredths,
    );

    Ok(Json(ShopDetails {
        links: shop_links(&shop),
        id: shop.id,
        name: shop.name,
        logo_url: shop.logo_url,
        address: shop.address,
        city: shop.city,
        latitude: shop.latitude,
        longitude: shop.longitude,
        phone_number: shop.phone_number,
        website_url: shop.website_url,
        chat_link: shop.chat_link,
        open_hours: shop.open_hours,
        description: shop.description,
        avg_rating: shop.avg_rating.unwrap_or(0.0),
        review_count: shop.review_count,
        distance,
        distance_text: distance.map(|km| format!("{km:.2} km")),
        images: images.into_iter().map(ImageItem::from).collect(),
        offers: offers.into_iter().map(DetailOffer::from).collect(),
    }))
}
