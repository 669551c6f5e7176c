//! REST handlers for serving, tracking, admin, analytics, and tenants.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use adserve_core::types::{Ad, AdClick, AdImpression, RequestContext, RequestMeta};
use adserve_core::AdError;
use adserve_delivery::{
    AdFilters, AdService, CreateAdRequest, EventRecorder, SelectionEngine, UpdateAdRequest,
};
use adserve_platform::{Tenant, TenantDirectory};
use adserve_reporting::{AnalyticsAggregator, AnalyticsFilters, AnalyticsReport};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<TenantDirectory>,
    pub service: Arc<AdService>,
    pub selection: Arc<SelectionEngine>,
    pub recorder: Arc<EventRecorder>,
    pub analytics: Arc<AnalyticsAggregator>,
    pub default_selection_limit: Option<usize>,
    pub start_time: Instant,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: AdError) -> ApiError {
    let (status, code) = match &err {
        AdError::AdNotFound(_) | AdError::TenantNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        AdError::MissingContentField { .. } | AdError::Validation(_) => {
            metrics::counter!("api.validation_errors").increment(1);
            (StatusCode::BAD_REQUEST, "invalid_request")
        }
        _ => {
            error!(error = %err, "Request failed");
            metrics::counter!("api.errors").increment(1);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

/// Client ip and user agent come from the request headers; the page the ad
/// was on comes from the tracking body.
fn request_meta(headers: &HeaderMap, page_url: String, referrer: Option<String>) -> RequestMeta {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RequestMeta {
        ip_address: header("x-forwarded-for")
            .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        user_agent: header("user-agent").unwrap_or_default(),
        page_url,
        referrer,
    }
}

// ─── Serving ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ServeQuery {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub post_type: Option<String>,
    /// Comma-separated category slugs.
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/v1/tenants/{tenant_id}/placements/{placement}/ads
///
/// The render path never fails the page: an unknown or suspended tenant
/// serves an empty list.
pub async fn serve_ads(
    State(state): State<AppState>,
    Path((tenant_id, placement)): Path<(Uuid, String)>,
    Query(query): Query<ServeQuery>,
) -> Json<Vec<Ad>> {
    if state.directory.ensure_active(tenant_id).is_err() {
        warn!(tenant_id = %tenant_id, "Serve request for unknown or suspended tenant");
        return Json(Vec::new());
    }

    let ctx = RequestContext {
        url: query.url.unwrap_or_default(),
        post_type: query.post_type,
        categories: query.categories.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        }),
    };
    let limit = query.limit.or(state.default_selection_limit);

    let ads = state
        .selection
        .select_for_placement(tenant_id, &placement, &ctx, limit);
    metrics::counter!("api.ads.served").increment(ads.len() as u64);
    Json(ads)
}

// ─── Tracking ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TrackImpressionRequest {
    pub page_url: String,
    #[serde(default)]
    pub referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackClickRequest {
    pub page_url: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub click_url: Option<String>,
    #[serde(default)]
    pub impression_id: Option<Uuid>,
}

/// POST /api/v1/tenants/{tenant_id}/ads/{id}/impressions
pub async fn track_impression(
    State(state): State<AppState>,
    Path((tenant_id, ad_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(req): Json<TrackImpressionRequest>,
) -> Result<(StatusCode, Json<AdImpression>), ApiError> {
    state
        .directory
        .ensure_active(tenant_id)
        .map_err(error_response)?;
    let meta = request_meta(&headers, req.page_url, req.referrer);
    let impression = state
        .recorder
        .record_impression(tenant_id, ad_id, &meta)
        .map_err(error_response)?;
    metrics::counter!("api.impressions.recorded").increment(1);
    Ok((StatusCode::CREATED, Json(impression)))
}

/// POST /api/v1/tenants/{tenant_id}/ads/{id}/clicks
pub async fn track_click(
    State(state): State<AppState>,
    Path((tenant_id, ad_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(req): Json<TrackClickRequest>,
) -> Result<(StatusCode, Json<AdClick>), ApiError> {
    state
        .directory
        .ensure_active(tenant_id)
        .map_err(error_response)?;
    let meta = request_meta(&headers, req.page_url, req.referrer);
    let click = state
        .recorder
        .record_click(tenant_id, ad_id, &meta, req.click_url, req.impression_id)
        .map_err(error_response)?;
    metrics::counter!("api.clicks.recorded").increment(1);
    Ok((StatusCode::CREATED, Json(click)))
}

// ─── Admin ─────────────────────────────────────────────────────────────────

/// GET /api/v1/tenants/{tenant_id}/ads
pub async fn list_ads(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(filters): Query<AdFilters>,
) -> Result<Json<Vec<Ad>>, ApiError> {
    state
        .directory
        .ensure_active(tenant_id)
        .map_err(error_response)?;
    Ok(Json(state.service.list_ads(tenant_id, &filters)))
}

/// POST /api/v1/tenants/{tenant_id}/ads
pub async fn create_ad(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<CreateAdRequest>,
) -> Result<(StatusCode, Json<Ad>), ApiError> {
    state
        .directory
        .ensure_active(tenant_id)
        .map_err(error_response)?;
    let ad = state
        .service
        .create_ad(tenant_id, req, None)
        .map_err(error_response)?;
    metrics::counter!("api.ads.created").increment(1);
    Ok((StatusCode::CREATED, Json(ad)))
}

/// GET /api/v1/tenants/{tenant_id}/ads/{id}
pub async fn get_ad(
    State(state): State<AppState>,
    Path((tenant_id, ad_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ad>, ApiError> {
    state
        .service
        .get_ad(tenant_id, ad_id)
        .map(Json)
        .map_err(error_response)
}

/// PUT /api/v1/tenants/{tenant_id}/ads/{id}
pub async fn update_ad(
    State(state): State<AppState>,
    Path((tenant_id, ad_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateAdRequest>,
) -> Result<Json<Ad>, ApiError> {
    state
        .service
        .update_ad(tenant_id, ad_id, req, None)
        .map(Json)
        .map_err(error_response)
}

/// DELETE /api/v1/tenants/{tenant_id}/ads/{id}
pub async fn delete_ad(
    State(state): State<AppState>,
    Path((tenant_id, ad_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_ad(tenant_id, ad_id)
        .map_err(error_response)?;
    metrics::counter!("api.ads.deleted").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/tenants/{tenant_id}/ads/{id}/toggle
pub async fn toggle_ad(
    State(state): State<AppState>,
    Path((tenant_id, ad_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ad>, ApiError> {
    state
        .service
        .toggle_ad(tenant_id, ad_id, None)
        .map(Json)
        .map_err(error_response)
}

// ─── Analytics ─────────────────────────────────────────────────────────────

/// GET /api/v1/tenants/{tenant_id}/analytics
pub async fn analytics_report(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(filters): Query<AnalyticsFilters>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    state
        .directory
        .ensure_active(tenant_id)
        .map_err(error_response)?;
    Ok(Json(state.analytics.report(tenant_id, &filters)))
}

// ─── Tenants ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// POST /api/v1/tenants
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<Tenant>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(error_response(AdError::Validation(
            "tenant name must not be empty".into(),
        )));
    }
    let tenant = state.directory.create_tenant(req.name, req.domain);
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// GET /api/v1/tenants
pub async fn list_tenants(State(state): State<AppState>) -> Json<Vec<Tenant>> {
    Json(state.directory.list_tenants())
}

// ─── Operational ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — readiness probe.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live — liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
