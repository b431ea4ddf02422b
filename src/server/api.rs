use crate::server::AppState;
use crate::store::{CategoryRow, LibraryFilter, LibraryRow, SortOrder, VersionRow};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

const LOG_TARGET: &str = "       api";

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;
const TRENDING_COUNT: i64 = 10;
const CATEGORY_DISTRIBUTION_COUNT: i64 = 10;
const DEFAULT_LATEST_DAYS: i64 = 30;
const DEFAULT_LATEST_COUNT: i64 = 20;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/libraries", get(list_libraries))
        .route("/libraries/{id}", get(get_library))
        .route("/categories", get(list_categories))
        .route("/trends", get(get_trends))
        .route("/latest", get(get_latest))
        .route("/stats", get(get_stats))
}

/// Failures surface as a JSON `{"error": ...}` body; internals are logged,
/// never exposed.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{what} not found"),
        }
    }
}

impl From<ohno::AppError> for ApiError {
    fn from(error: ohno::AppError) -> Self {
        log::error!(target: LOG_TARGET, "Request failed: {error:#}");

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = core::result::Result<axum::Json<T>, ApiError>;

/// A library with its category associations embedded.
#[derive(Debug, Serialize)]
struct LibraryPayload {
    #[serde(flatten)]
    library: LibraryRow,
    categories: Vec<CategoryRow>,
}

#[derive(Debug, Deserialize)]
struct LibrariesQuery {
    ecosystem: Option<String>,
    category_id: Option<i64>,
    search: Option<String>,

    #[serde(default)]
    sort: SortOrder,

    #[serde(default = "default_page_size")]
    limit: i64,

    #[serde(default)]
    offset: i64,
}

const fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Serialize)]
struct LibrariesResponse {
    total: i64,
    limit: i64,
    offset: i64,
    libraries: Vec<LibraryPayload>,
}

async fn list_libraries(State(state): State<AppState>, Query(query): Query<LibrariesQuery>) -> ApiResult<LibrariesResponse> {
    let filter = LibraryFilter {
        ecosystem: query.ecosystem,
        category_id: query.category_id,
        search: query.search,
        sort: query.sort,
        limit: query.limit.clamp(1, MAX_PAGE_SIZE),
        offset: query.offset.max(0),
    };

    let (total, rows) = state.catalog.list_libraries(&filter).await?;
    let libraries = with_categories(&state, rows).await?;

    Ok(axum::Json(LibrariesResponse {
        total,
        limit: filter.limit,
        offset: filter.offset,
        libraries,
    }))
}

#[derive(Debug, Serialize)]
struct LibraryDetailResponse {
    #[serde(flatten)]
    library: LibraryPayload,
    versions: Vec<VersionRow>,
}

async fn get_library(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<LibraryDetailResponse> {
    let Some(library) = state.catalog.library(id).await? else {
        return Err(ApiError::not_found("library"));
    };

    let versions = state.catalog.versions(id).await?;
    let mut payloads = with_categories(&state, vec![library]).await?;
    let Some(library) = payloads.pop() else {
        return Err(ApiError::not_found("library"));
    };

    Ok(axum::Json(LibraryDetailResponse { library, versions }))
}

#[derive(Debug, Deserialize)]
struct CategoriesQuery {
    kind: Option<String>,
}

async fn list_categories(State(state): State<AppState>, Query(query): Query<CategoriesQuery>) -> ApiResult<serde_json::Value> {
    let categories = state.catalog.list_categories(query.kind.as_deref()).await?;

    Ok(axum::Json(json!({ "categories": categories })))
}

async fn get_trends(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let trending = state.catalog.trending(TRENDING_COUNT).await?;
    let trending = with_categories(&state, trending).await?;

    let ecosystems = state.catalog.ecosystem_distribution().await?;
    let categories = state.catalog.category_distribution(CATEGORY_DISTRIBUTION_COUNT).await?;

    Ok(axum::Json(json!({
        "trending_libraries": trending,
        "ecosystem_distribution": ecosystems,
        "category_distribution": categories,
    })))
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    #[serde(default = "default_latest_days")]
    days: i64,

    #[serde(default = "default_latest_count")]
    limit: i64,
}

const fn default_latest_days() -> i64 {
    DEFAULT_LATEST_DAYS
}

const fn default_latest_count() -> i64 {
    DEFAULT_LATEST_COUNT
}

#[derive(Debug, Serialize)]
struct LatestResponse {
    latest_libraries: Vec<LibraryPayload>,
    cutoff_date: DateTime<Utc>,
    days: i64,
}

async fn get_latest(State(state): State<AppState>, Query(query): Query<LatestQuery>) -> ApiResult<LatestResponse> {
    let days = query.days.clamp(1, 3650);
    let cutoff = Utc::now() - Duration::days(days);

    let rows = state.catalog.updated_since(cutoff, query.limit.clamp(1, MAX_PAGE_SIZE)).await?;
    let latest_libraries = with_categories(&state, rows).await?;

    Ok(axum::Json(LatestResponse {
        latest_libraries,
        cutoff_date: cutoff,
        days,
    }))
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<crate::store::CatalogStats> {
    Ok(axum::Json(state.catalog.stats().await?))
}

/// Attach category associations to a page of library rows.
async fn with_categories(state: &AppState, rows: Vec<LibraryRow>) -> core::result::Result<Vec<LibraryPayload>, ApiError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut categories = state.catalog.categories_for(&ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| LibraryPayload {
            categories: categories.remove(&row.id).unwrap_or_default(),
            library: row,
        })
        .collect())
}
