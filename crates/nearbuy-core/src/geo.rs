//! Great-circle distance and bounding-box helpers.
//!
//! Every caller chooses its rounding through [`Precision`]; nothing in this
//! module rounds implicitly.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Headroom on the box radius so distances that round down onto the
/// requested radius still fall inside it.
const BOX_RADIUS_FACTOR: f64 = 1.01;
const BOX_RADIUS_SLACK_KM: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a point only when both coordinates are present and not NaN.
    #[must_use]
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if !lat.is_nan() && !lng.is_nan() => Some(Self { lat, lng }),
            _ => None,
        }
    }

    /// Haversine distance to `other`, rounded to `precision`.
    #[must_use]
    pub fn distance_to(&self, other: GeoPoint, precision: Precision) -> f64 {
        precision.apply(haversine_km(*self, other))
    }
}

/// Rounding applied to a computed distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Exact,
    /// Two decimal places (10 m resolution).
    Hundredths,
    /// Three decimal places (1 m resolution).
    Thousandths,
}

impl Precision {
    #[must_use]
    pub fn apply(self, km: f64) -> f64 {
        match self {
            Precision::Exact => km,
            Precision::Hundredths => (km * 100.0).round() / 100.0,
            Precision::Thousandths => (km * 1000.0).round() / 1000.0,
        }
    }
}

/// Unrounded great-circle distance in kilometres.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two optional coordinate pairs.
///
/// Returns `None` when any input is missing or NaN.
#[must_use]
pub fn distance_km(
    lat1: Option<f64>,
    lng1: Option<f64>,
    lat2: Option<f64>,
    lng2: Option<f64>,
    precision: Precision,
) -> Option<f64> {
    let from = GeoPoint::from_parts(lat1, lng1)?;
    let to = GeoPoint::from_parts(lat2, lng2)?;
    Some(from.distance_to(to, precision))
}

/// Axis-aligned lat/lng box around a centre point.
///
/// Only a coarse pre-filter: callers re-check inclusion with [`haversine_km`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box covering every point within `radius_km` (haversine)
    /// of `center`, with the radius padded by 1% plus 10 m.
    ///
    /// When the circle reaches a pole or crosses the antimeridian the box
    /// spans every longitude instead of wrapping.
    #[must_use]
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let padded = radius_km.max(0.0) * BOX_RADIUS_FACTOR + BOX_RADIUS_SLACK_KM;
        let angular = padded / EARTH_RADIUS_KM;
        let lat_delta = angular.to_degrees();

        let min_lat = (center.lat - lat_delta).max(-90.0);
        let max_lat = (center.lat + lat_delta).min(90.0);

        // Widest longitude the circle reaches: asin(sin d / cos lat).
        let reach = angular.sin() / center.lat.to_radians().cos();
        let touches_pole = min_lat <= -90.0 || max_lat >= 90.0;
        if touches_pole || angular >= std::f64::consts::FRAC_PI_2 || reach.is_nan() || reach >= 1.0
        {
            return Self::all_longitudes(min_lat, max_lat);
        }

        let lng_delta = reach.asin().to_degrees();
        let min_lng = center.lng - lng_delta;
        let max_lng = center.lng + lng_delta;
        if min_lng < -180.0 || max_lng > 180.0 {
            return Self::all_longitudes(min_lat, max_lat);
        }

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    fn all_longitudes(min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng: -180.0,
            max_lng: 180.0,
        }
    }

    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

/// Human-friendly distance label: metres under 1 km, one decimal under
/// 10 km (dropping a trailing `.0`), whole kilometres beyond.
#[must_use]
pub fn format_distance(km: f64) -> Option<String> {
    if km.is_nan() {
        return None;
    }
    if km < 1.0 {
        return Some(format!("{:.0} m", (km * 1000.0).round()));
    }
    if km < 10.0 {
        let tenths = (km * 10.0).round() / 10.0;
        return Some(if tenths.fract().abs() < f64::EPSILON {
            format!("{tenths:.0} km")
        } else {
            format!("{tenths:.1} km")
        });
    }
    Some(format!("{:.0} km", km.round()))
}

/// Numeric companion to [`format_distance`].
#[must_use]
pub fn round_distance_for_display(km: f64) -> Option<f64> {
    if km.is_nan() {
        return None;
    }
    if km < 1.0 {
        return Some(Precision::Thousandths.apply(km));
    }
    if km < 10.0 {
        return Some((km * 10.0).round() / 10.0);
    }
    Some(km.round())
}
