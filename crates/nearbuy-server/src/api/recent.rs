//! Per-user recent searches.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nearbuy_db::{NewSearchHistory, SearchHistoryRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, parse_path_id, require_user_id, ApiError, AppState};

const RECENT_SEARCH_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SaveRecentBody {
    pub user_id: Option<String>,
    pub query: Option<String>,
    pub target_id: Option<String>,
    pub target_name: Option<String>,
    pub target_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecentSearchItem {
    id: Uuid,
    query: String,
    target_id: Option<String>,
    target_name: Option<String>,
    target_type: Option<String>,
    searched_at: DateTime<Utc>,
}

impl From<SearchHistoryRow> for RecentSearchItem {
    fn from(row: SearchHistoryRow) -> Self {
        Self {
            id: row.id,
            query: row.query,
            target_id: row.target_id,
            target_name: row.target_name,
            target_type: row.target_type,
            searched_at: row.searched_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct RecentSearchesResponse {
    searches: Vec<RecentSearchItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SavedSearchResponse {
    message: &'static str,
    search: RecentSearchItem,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedResponse {
    message: &'static str,
    deleted: u64,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(super) async fn list_recent(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UserQuery>,
) -> Result<Json<RecentSearchesResponse>, ApiError> {
    let user_id = require_user_id(&req_id.0, query.user_id.as_deref())?;

    let rows = nearbuy_db::list_recent_searches(&state.pool, user_id, RECENT_SEARCH_LIMIT)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(RecentSearchesResponse {
        searches: rows.into_iter().map(RecentSearchItem::from).collect(),
    }))
}

pub(super) async fn save_recent(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SaveRecentBody>,
) -> Result<Json<SavedSearchResponse>, ApiError> {
    let user_id = require_user_id(&req_id.0, body.user_id.as_deref())?;
    let query = non_blank(body.query.as_deref())
        .ok_or_else(|| ApiError::validation(req_id.0.clone(), "query is required"))?;

    let row = nearbuy_db::upsert_search_history(
        &state.pool,
        user_id,
        &NewSearchHistory {
            query,
            target_id: non_blank(body.target_id.as_deref()),
            target_name: non_blank(body.target_name.as_deref()),
            target_type: non_blank(body.target_type.as_deref()),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(SavedSearchResponse {
        message: "search saved to history",
        search: row.into(),
    }))
}

pub(super) async fn delete_recent(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let user_id = require_user_id(&req_id.0, query.user_id.as_deref())?;
    let entry_id = parse_path_id(&req_id.0, &id, "search history entry")?;

    match nearbuy_db::delete_search_history(&state.pool, user_id, entry_id).await {
        Ok(()) => Ok(Json(DeletedResponse {
            message: "search history deleted",
            deleted: 1,
        })),
        Err(nearbuy_db::DbError::NotFound) => Err(ApiError::not_found(
            req_id.0.clone(),
            "search history entry",
        )),
        Err(e) => Err(map_db_error(req_id.0.clone(), &e)),
    }
}

pub(super) async fn clear_recent(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UserQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let user_id = require_user_id(&req_id.0, query.user_id.as_deref())?;

    let deleted = nearbuy_db::clear_search_history(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(DeletedResponse {
        message: "search history cleared",
        deleted,
    }))
}
