//! Visa API handlers
//!
//! Control surface for the enrichment loop plus the read surface over
//! visa_status. Control calls return immediately; the loop's ticks run on
//! their own timer task.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use visadex_common::db::models::{Country, VisaStatus, VisaStatusRecord};

use crate::error::{ApiError, ApiResult};
use crate::services::enrichment::{StartOutcome, StopOutcome};
use crate::{db, AppState};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Short status message returned by the control surface
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct StartEnrichmentParams {
    /// Optional passport country name to scope the run to
    pub country: Option<String>,
}

/// POST /visas/enrichment/start
///
/// Arms the enrichment timer. Starting twice is an informational no-op.
/// An unknown scope country is a 404 and leaves the loop idle.
pub async fn start_enrichment(
    State(state): State<AppState>,
    Query(params): Query<StartEnrichmentParams>,
) -> ApiResult<Json<MessageResponse>> {
    let scope = match &params.country {
        Some(name) => {
            let country = db::countries::find_by_name(&state.db, name)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Country not found: {name}")))?;
            Some(country)
        }
        None => None,
    };

    let outcome = state
        .enrichment
        .start(scope.as_ref().map(|c| c.id))
        .await;

    let message = match (outcome, scope) {
        (StartOutcome::AlreadyRunning, _) => "Already running!".to_string(),
        (StartOutcome::Started, Some(country)) => {
            format!("Visa status update started for {}!", country.name)
        }
        (StartOutcome::Started, None) => "Visa status update started!".to_string(),
    };

    Ok(Json(MessageResponse { message }))
}

/// POST /visas/enrichment/stop
///
/// Safe to call when idle; returns an informational message either way.
pub async fn stop_enrichment(State(state): State<AppState>) -> Json<MessageResponse> {
    let message = match state.enrichment.stop().await {
        StopOutcome::Stopped => "Visa status update stopped!".to_string(),
        StopOutcome::NotRunning => "No active visa status update running.".to_string(),
    };

    Json(MessageResponse { message })
}

#[derive(Debug, Deserialize)]
pub struct StatusLookupParams {
    pub passport: String,
    pub destination: String,
}

/// GET /visas/status?passport=<name>&destination=<name>
pub async fn get_status(
    State(state): State<AppState>,
    Query(params): Query<StatusLookupParams>,
) -> ApiResult<Json<VisaStatusRecord>> {
    let record = db::visa_status::find_by_names(&state.db, &params.passport, &params.destination)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No visa record for {} -> {}",
                params.passport, params.destination
            ))
        })?;

    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct ListStatusParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    #[serde(default)]
    pub include_unresolved: bool,
}

/// GET /visas/all response
#[derive(Debug, Serialize)]
pub struct ListStatusResponse {
    pub data: Vec<VisaStatusRecord>,
    pub total_records: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

/// GET /visas/all?page=&page_size=&include_unresolved=
pub async fn list_statuses(
    State(state): State<AppState>,
    Query(params): Query<ListStatusParams>,
) -> ApiResult<Json<ListStatusResponse>> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page < 1 {
        return Err(ApiError::BadRequest("page must be >= 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::BadRequest(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let (data, total_records) =
        db::visa_status::list(&state.db, page, page_size, params.include_unresolved).await?;

    let total_pages = (total_records + page_size - 1) / page_size;

    Ok(Json(ListStatusResponse {
        data,
        total_records,
        total_pages,
        current_page: page,
        page_size,
    }))
}

/// GET /visas/valid-passports
pub async fn valid_passports(State(state): State<AppState>) -> ApiResult<Json<Vec<Country>>> {
    let passports = db::visa_status::valid_passports(&state.db).await?;
    Ok(Json(passports))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Canonical status string (VISA_FREE, VISA_REQUIRED, E_VISA)
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

/// PUT /visas/status/:id
///
/// Manual correction of one record. Only canonical status strings are
/// accepted here; normalization of model output happens in the classifier.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let status = VisaStatus::parse_canonical(&request.status).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid status value: {:?}", request.status))
    })?;

    let touched = db::visa_status::persist_status(&state.db, id, status, &request.notes).await?;
    if touched == 0 {
        return Err(ApiError::NotFound(format!("No visa record with id {id}")));
    }

    Ok(Json(MessageResponse {
        message: format!("Visa record {id} updated"),
    }))
}

/// Build visa routes
pub fn visa_routes() -> Router<AppState> {
    Router::new()
        .route("/visas/enrichment/start", post(start_enrichment))
        .route("/visas/enrichment/stop", post(stop_enrichment))
        .route("/visas/status", get(get_status))
        .route("/visas/status/:id", put(update_status))
        .route("/visas/all", get(list_statuses))
        .route("/visas/valid-passports", get(valid_passports))
}
