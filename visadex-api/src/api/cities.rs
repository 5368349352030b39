//! City generation handlers

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use visadex_common::db::models::City;

use crate::error::ApiResult;
use crate::{db, AppState};

const DEFAULT_GENERATE_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct GenerateCitiesParams {
    /// Maximum number of countries to backfill in this call
    pub limit: Option<i64>,
}

/// POST /cities/generate?limit=
///
/// For up to `limit` countries with no cities yet, ask the model for a
/// handful of cities and store them. A failure for one country skips that
/// country; the rest still complete.
pub async fn generate_cities(
    State(state): State<AppState>,
    Query(params): Query<GenerateCitiesParams>,
) -> ApiResult<Json<Vec<City>>> {
    let limit = params.limit.unwrap_or(DEFAULT_GENERATE_LIMIT).max(1);

    let countries = db::cities::countries_without_cities(&state.db, limit).await?;
    tracing::info!(count = countries.len(), "Generating cities");

    let mut all_cities = Vec::new();
    for country in &countries {
        match state.city_generator.generate_for_country(country).await {
            Ok(generated) => {
                let inserted = db::cities::insert_cities(&state.db, country.id, &generated).await?;
                all_cities.extend(inserted);
            }
            Err(e) => {
                tracing::warn!(country = %country.name, error = %e, "City generation failed, skipping country");
            }
        }
    }

    Ok(Json(all_cities))
}

/// Build city routes
pub fn city_routes() -> Router<AppState> {
    Router::new().route("/cities/generate", post(generate_cities))
}
