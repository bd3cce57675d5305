mod categories;
mod places;
mod recent;
mod search;
mod shops;
mod suggestions;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::NaiveTime;
use nearbuy_core::{AppConfig, BehaviourError, BehaviourRegistry, CriteriaError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: Arc<BehaviourRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            pool,
            registry: Arc::new(BehaviourRegistry::with_defaults()),
            config,
        }
    }
}

/// Error body shared by every route: `{ error, code, requestId }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub code: String,
    pub request_id: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            request_id: request_id.into(),
        }
    }

    pub(super) fn validation(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }

    pub(super) fn not_found(request_id: impl Into<String>, what: &str) -> Self {
        Self::new(request_id, "not_found", format!("{what} not found"))
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" | "unknown_behaviour" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &nearbuy_db::DbError) -> ApiError {
    if matches!(error, nearbuy_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(request_id = %request_id, error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_criteria_error(request_id: String, error: &CriteriaError) -> ApiError {
    ApiError::validation(request_id, error.to_string())
}

/// Unknown behaviours are the caller's problem; a stored config the handler
/// cannot use, or a failed fetch, is ours.
pub(super) fn map_behaviour_error(request_id: String, error: &BehaviourError) -> ApiError {
    match error {
        BehaviourError::UnknownBehaviour(_) => {
            ApiError::new(request_id, "unknown_behaviour", error.to_string())
        }
        BehaviourError::Source(source) => {
            tracing::error!(request_id = %request_id, error = %source, "section fetch failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
        BehaviourError::InvalidConfig { .. } | BehaviourError::MissingHandler(_) => {
            tracing::error!(request_id = %request_id, error = %error, "section misconfigured");
            ApiError::new(request_id, "internal_error", "section is misconfigured")
        }
    }
}

/// Parses an optional `userId`; blank counts as absent.
pub(super) fn parse_user_id(request_id: &str, raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => Uuid::parse_str(v)
            .map(Some)
            .map_err(|_| ApiError::validation(request_id, "userId must be a UUID")),
    }
}

pub(super) fn require_user_id(request_id: &str, raw: Option<&str>) -> Result<Uuid, ApiError> {
    parse_user_id(request_id, raw)?
        .ok_or_else(|| ApiError::validation(request_id, "userId is required"))
}

/// Path ids that are not UUIDs cannot name an existing record.
pub(super) fn parse_path_id(request_id: &str, raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(request_id, what))
}

/// Parses an optional non-negative integer parameter.
pub(super) fn parse_count(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<usize>, CriteriaError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|_| CriteriaError::NotANumber { field }),
    }
}

/// Wall-clock time used for open-hours checks.
pub(super) fn local_time_now() -> NaiveTime {
    chrono::Local::now().time()
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/search/shops", get(search::search_shops))
        .route("/api/search/suggestions", get(search::search_suggestions))
        .route("/api/search/shop/{id}", get(search::get_shop_search_detail))
        .route(
            "/api/search/recent",
            get(recent::list_recent)
                .post(recent::save_recent)
                .delete(recent::clear_recent),
        )
        .route("/api/search/recent/{id}", delete(recent::delete_recent))
        .route("/api/suggestions", get(suggestions::list_sections))
        .route(
            "/api/suggestions/{section_id}/shops",
            get(suggestions::list_section_shops),
        )
        .route(
            "/api/suggestions/{section_id}/quick-snacks",
            get(suggestions::list_quick_snack_categories),
        )
        .route("/api/places/saved", get(places::list_saved_places))
        .route("/api/categories", get(categories::list_categories))
        .route(
            "/api/shops/category/{category_id}",
            get(shops::list_shops_by_category),
        )
        .route("/api/shops/{shop_id}/details", get(shops::get_shop_details))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(CompressionLayer::new())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match nearbuy_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
