//! visadex-api library interface
//!
//! Exposes the router, application state, data access, and the enrichment
//! services for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::country_loader::CountryLoader;
use crate::services::city_generator::CityGenerator;
use crate::services::enrichment::EnrichmentController;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Controller for the visa enrichment loop
    pub enrichment: Arc<EnrichmentController>,
    /// REST Countries bulk importer
    pub country_loader: Arc<CountryLoader>,
    /// LLM-backed city generator
    pub city_generator: Arc<CityGenerator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        enrichment: Arc<EnrichmentController>,
        country_loader: Arc<CountryLoader>,
        city_generator: Arc<CityGenerator>,
    ) -> Self {
        Self {
            db,
            enrichment,
            country_loader,
            city_generator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::visa_routes())
        .merge(api::country_routes())
        .merge(api::city_routes())
        .with_state(state)
}
