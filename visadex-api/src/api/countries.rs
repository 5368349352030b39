//! Country data loading handlers
//!
//! One-shot administrative endpoints: bulk import of the country reference
//! list and materialization of the passport x destination cross product.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

/// POST /countries/load response
#[derive(Debug, Serialize)]
pub struct LoadCountriesResponse {
    pub message: String,
    pub count: u64,
}

/// POST /countries/load
///
/// Replaces the countries table with a fresh import from REST Countries.
/// Dependent visa and city rows are dropped with the old countries.
pub async fn load_countries(
    State(state): State<AppState>,
) -> ApiResult<Json<LoadCountriesResponse>> {
    let countries = state
        .country_loader
        .fetch_all()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    if countries.is_empty() {
        return Err(ApiError::Upstream(
            "Country source returned no data".to_string(),
        ));
    }

    let count = db::countries::replace_all(&state.db, &countries).await?;
    tracing::info!(count, "Countries imported");

    Ok(Json(LoadCountriesResponse {
        message: "Countries imported".to_string(),
        count,
    }))
}

/// POST /countries/pairs response
#[derive(Debug, Serialize)]
pub struct MaterializePairsResponse {
    pub message: String,
    pub total: u64,
}

/// POST /countries/pairs
///
/// Rebuilds visa_status as every ordered pair of distinct countries, all
/// starting unresolved.
pub async fn materialize_pairs(
    State(state): State<AppState>,
) -> ApiResult<Json<MaterializePairsResponse>> {
    let total = db::visa_status::materialize_pairs(&state.db).await?;
    tracing::info!(total, "Visa status pairs materialized");

    Ok(Json(MaterializePairsResponse {
        message: "Visa status pairs materialized".to_string(),
        total,
    }))
}

/// Build country routes
pub fn country_routes() -> Router<AppState> {
    Router::new()
        .route("/countries/load", post(load_countries))
        .route("/countries/pairs", post(materialize_pairs))
}
