//! visadex-api - Travel reference backend
//!
//! REST service over the visadex SQLite database: country reference data,
//! LLM-backed visa-status enrichment, and city generation.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use visadex_api::db::SqliteVisaStore;
use visadex_api::services::enrichment::{EnrichmentController, EnrichmentSettings};
use visadex_api::services::{
    CityGenerator, CountryLoader, OpenAiClassifier, OpenAiClient, ResponseLog,
};
use visadex_api::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting visadex-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = visadex_common::config::load_config()?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(visadex_common::config::default_database_path);
    info!("Database: {}", db_path.display());
    let db_pool = visadex_common::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let api_key = visadex_common::config::resolve_openai_api_key(&config)?;

    let build_client = || -> Result<OpenAiClient> {
        let mut client = OpenAiClient::new(api_key.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create OpenAI client: {e}"))?;
        if let Some(base_url) = &config.openai_base_url {
            client = client.with_base_url(base_url.clone());
        }
        if let Some(model) = &config.openai_model {
            client = client.with_model(model.clone());
        }
        Ok(client)
    };

    let response_log = config.response_log.clone().map(ResponseLog::new);
    let classifier = Arc::new(OpenAiClassifier::new(build_client()?, response_log));

    let store = Arc::new(SqliteVisaStore::new(db_pool.clone()));
    let settings = EnrichmentSettings::from(&config.enrichment);
    info!(
        interval = ?settings.interval,
        batch_limit = settings.batch_limit,
        "Enrichment loop configured"
    );
    let enrichment = Arc::new(EnrichmentController::new(store, classifier, settings));

    let country_loader = Arc::new(
        CountryLoader::new().map_err(|e| anyhow::anyhow!("Failed to create country loader: {e}"))?,
    );
    let city_generator = Arc::new(CityGenerator::new(build_client()?));

    let state = AppState::new(db_pool, enrichment, country_loader, city_generator);
    let app = visadex_api::build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(listener, app).await?;

    Ok(())
}
