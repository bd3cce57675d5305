//! Filter, radius-bound and order shop cards for a single request.
//!
//! The pipeline never fails on bad per-shop data. A shop with no coordinates,
//! rating, prices or parseable hours only loses the derived value or drops
//! out of a filter that needs it.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{ShopCard, ShopRecord};
use crate::geo::{distance_km, GeoPoint, Precision};
use crate::hours::{parse_clock, OpenHours};

/// Raised while turning raw request parameters into [`FilterCriteria`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("{field} must be a number")]
    NotANumber { field: &'static str },

    #[error("{field} {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },

    #[error("{field} must be one of {expected}")]
    UnknownValue {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{field} must be a time like 10:00 or 9:30 PM")]
    InvalidTime { field: &'static str },

    #[error("customOpenFrom or customOpenTo is required when hoursFilter is custom")]
    EmptyCustomWindow,
}

impl CriteriaError {
    /// Request parameter the error is about.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            CriteriaError::NotANumber { field }
            | CriteriaError::OutOfRange { field, .. }
            | CriteriaError::UnknownValue { field, .. }
            | CriteriaError::InvalidTime { field } => field,
            CriteriaError::EmptyCustomWindow => "hoursFilter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Distance,
    Rating,
    Price,
    #[default]
    Relevance,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Distance => "distance",
            SortKey::Rating => "rating",
            SortKey::Price => "price",
            SortKey::Relevance => "relevance",
        }
    }
}

impl FromStr for SortKey {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(SortKey::Distance),
            "rating" => Ok(SortKey::Rating),
            "price" => Ok(SortKey::Price),
            "relevance" => Ok(SortKey::Relevance),
            _ => Err(CriteriaError::UnknownValue {
                field: "sortBy",
                expected: "distance, rating, price, relevance",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoursFilter {
    #[default]
    Any,
    OpenNow,
    Custom {
        from: Option<NaiveTime>,
        to: Option<NaiveTime>,
    },
}

impl HoursFilter {
    /// Builds the filter from `hoursFilter`, `customOpenFrom` and `customOpenTo`.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError`] for an unknown mode, an unparseable time, or a
    /// `custom` mode with neither bound.
    pub fn parse(
        mode: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self, CriteriaError> {
        match mode.map(str::trim).filter(|m| !m.is_empty()) {
            None | Some("any") => Ok(HoursFilter::Any),
            Some("openNow") => Ok(HoursFilter::OpenNow),
            Some("custom") => {
                let from = parse_time_param("customOpenFrom", from)?;
                let to = parse_time_param("customOpenTo", to)?;
                if from.is_none() && to.is_none() {
                    return Err(CriteriaError::EmptyCustomWindow);
                }
                Ok(HoursFilter::Custom { from, to })
            }
            Some(_) => Err(CriteriaError::UnknownValue {
                field: "hoursFilter",
                expected: "any, openNow, custom",
            }),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HoursFilter::Any => "any",
            HoursFilter::OpenNow => "openNow",
            HoursFilter::Custom { .. } => "custom",
        }
    }

    fn passes(&self, open_hours: Option<&str>, now: NaiveTime) -> bool {
        let parsed = || open_hours.and_then(OpenHours::parse);
        match self {
            HoursFilter::Any => true,
            HoursFilter::OpenNow => parsed().is_some_and(|h| h.is_open_at(now)),
            HoursFilter::Custom { from, to } => parsed().is_some_and(|h| h.overlaps(*from, *to)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    /// True when a shop priced `[shop_min, shop_max]` overlaps this range.
    /// A shop without prices only passes when no bound is set.
    #[must_use]
    pub fn overlaps(&self, shop_min: Option<f64>, shop_max: Option<f64>) -> bool {
        let above_min = self
            .min
            .is_none_or(|min| shop_max.is_some_and(|hi| hi >= min));
        let below_max = self
            .max
            .is_none_or(|max| shop_min.is_some_and(|lo| lo <= max));
        above_min && below_max
    }
}

/// Widen-once policy for thin radius results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusFallback {
    /// Widen when fewer than this many shops survive the requested radius.
    pub min_results: usize,
    pub radius_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub origin: Option<GeoPoint>,
    /// `None` skips radius filtering even when `origin` is set.
    pub radius_km: Option<f64>,
    /// `None` is the "no restriction" sentinel.
    pub min_rating: Option<f64>,
    pub price: PriceRange,
    pub hours: HoursFilter,
    /// Lowercased chip; matches menu category names exactly or item names by substring.
    pub chip: Option<String>,
    pub sort: SortKey,
    pub fallback: Option<RadiusFallback>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            origin: None,
            radius_km: None,
            min_rating: None,
            price: PriceRange::default(),
            hours: HoursFilter::Any,
            chip: None,
            sort: SortKey::Relevance,
            fallback: None,
            limit: None,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    /// The requested page of sorted cards.
    pub cards: Vec<ShopCard>,
    /// Cards surviving all filters, before `offset`/`limit`.
    pub total: usize,
    /// Radius actually applied, after any fallback widening.
    pub effective_radius_km: Option<f64>,
    /// Distinct menu categories across every surviving card, first-seen order.
    pub menu_categories: Vec<String>,
}

/// Runs the full pipeline: annotate, filter, radius-bound, sort, paginate.
#[must_use]
pub fn rank(shops: &[ShopRecord], criteria: &FilterCriteria, now: NaiveTime) -> Ranked {
    let candidates: Vec<ShopCard> = shops
        .iter()
        .filter_map(|shop| annotate(shop, criteria, now))
        .collect();

    let (mut cards, effective_radius_km) = apply_radius(candidates, criteria);
    sort_cards(&mut cards, criteria.sort);

    let mut menu_categories: Vec<String> = Vec::new();
    for name in cards.iter().flat_map(|c| c.menu_categories.iter()) {
        if !menu_categories.contains(name) {
            menu_categories.push(name.clone());
        }
    }

    let total = cards.len();
    let cards = cards
        .into_iter()
        .skip(criteria.offset)
        .take(criteria.limit.unwrap_or(usize::MAX))
        .collect();

    Ranked {
        cards,
        total,
        effective_radius_km,
        menu_categories,
    }
}

fn annotate(shop: &ShopRecord, criteria: &FilterCriteria, now: NaiveTime) -> Option<ShopCard> {
    let mut card = ShopCard::from_record(shop);
    let origin = criteria.origin;
    card.distance_km = distance_km(
        origin.map(|o| o.lat),
        origin.map(|o| o.lng),
        shop.latitude,
        shop.longitude,
        Precision::Hundredths,
    );

    if criteria.min_rating.is_some_and(|min| card.rating < min) {
        return None;
    }
    if !criteria.price.overlaps(card.min_price, card.max_price) {
        return None;
    }
    if !criteria.hours.passes(shop.open_hours.as_deref(), now) {
        return None;
    }

    if let Some(chip) = criteria.chip.as_deref() {
        let matches: Vec<_> = shop
            .menus
            .iter()
            .filter(|m| m.is_available)
            .filter(|m| {
                m.category().is_some_and(|c| c.to_lowercase() == chip)
                    || m.item_name.to_lowercase().contains(chip)
            })
            .cloned()
            .collect();
        if matches.is_empty() {
            return None;
        }
        card.chip_menus = Some(matches);
    }

    Some(card)
}

fn apply_radius(cards: Vec<ShopCard>, criteria: &FilterCriteria) -> (Vec<ShopCard>, Option<f64>) {
    let (Some(_), Some(requested)) = (criteria.origin, criteria.radius_km) else {
        return (cards, criteria.radius_km);
    };

    let within = |card: &ShopCard, radius: f64| card.distance_km.is_some_and(|d| d <= radius);

    let radius = match criteria.fallback {
        Some(fallback)
            if cards.iter().filter(|c| within(c, requested)).count() < fallback.min_results =>
        {
            requested.max(fallback.radius_km)
        }
        _ => requested,
    };

    let kept = cards.into_iter().filter(|c| within(c, radius)).collect();
    (kept, Some(radius))
}

/// Stable sort; equal keys keep their upstream order.
pub fn sort_cards(cards: &mut [ShopCard], key: SortKey) {
    match key {
        SortKey::Distance => cards.sort_by(|a, b| nulls_last(a.distance_km, b.distance_km)),
        SortKey::Rating => cards.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortKey::Price => cards.sort_by(|a, b| nulls_last(a.min_price, b.min_price)),
        SortKey::Relevance => {}
    }
}

fn nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Parses an optional numeric query parameter; blank counts as absent.
///
/// # Errors
///
/// Returns [`CriteriaError::NotANumber`] when the value is not a finite number.
pub fn parse_number(field: &'static str, raw: Option<&str>) -> Result<Option<f64>, CriteriaError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or(CriteriaError::NotANumber { field }),
    }
}

/// Parses `minRating`: absent, `any` or `0` mean no restriction.
///
/// # Errors
///
/// Returns [`CriteriaError`] when the value is not a number in `0..=5`.
pub fn parse_min_rating(raw: Option<&str>) -> Result<Option<f64>, CriteriaError> {
    if raw.map(str::trim) == Some("any") {
        return Ok(None);
    }
    match parse_number("minRating", raw)? {
        None => Ok(None),
        Some(v) if !(0.0..=5.0).contains(&v) => Err(CriteriaError::OutOfRange {
            field: "minRating",
            reason: "must be between 0 and 5 or \"any\"",
        }),
        Some(v) if v <= 0.0 => Ok(None),
        Some(v) => Ok(Some(v)),
    }
}

/// Parses a radius parameter, falling back to `default` when absent.
///
/// # Errors
///
/// Returns [`CriteriaError`] when the value is not a non-negative number.
pub fn parse_radius(raw: Option<&str>, default: f64) -> Result<f64, CriteriaError> {
    match parse_number("radius", raw)? {
        None => Ok(default),
        Some(v) if v < 0.0 => Err(CriteriaError::OutOfRange {
            field: "radius",
            reason: "must not be negative",
        }),
        Some(v) => Ok(v),
    }
}

/// Parses the `lat`/`lng` pair. Either both are present or the location is absent.
///
/// # Errors
///
/// Returns [`CriteriaError`] for non-numeric or out-of-range coordinates.
pub fn parse_origin(lat: Option<&str>, lng: Option<&str>) -> Result<Option<GeoPoint>, CriteriaError> {
    let lat = parse_number("lat", lat)?;
    let lng = parse_number("lng", lng)?;
    if lat.is_some_and(|v| !(-90.0..=90.0).contains(&v)) {
        return Err(CriteriaError::OutOfRange {
            field: "lat",
            reason: "must be between -90 and 90",
        });
    }
    if lng.is_some_and(|v| !(-180.0..=180.0).contains(&v)) {
        return Err(CriteriaError::OutOfRange {
            field: "lng",
            reason: "must be between -180 and 180",
        });
    }
    Ok(GeoPoint::from_parts(lat, lng))
}

fn parse_time_param(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveTime>, CriteriaError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_clock(v)
            .map(Some)
            .ok_or(CriteriaError::InvalidTime { field }),
    }
}

#[cfg(test)]
#[path = "ranking_test.rs"]
mod tests;
