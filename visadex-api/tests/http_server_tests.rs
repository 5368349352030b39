//! HTTP surface integration tests
//!
//! Drives the router directly with tower::ServiceExt::oneshot over an
//! in-memory database.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use visadex_api::db::SqliteVisaStore;
use visadex_api::services::classifier::{Classification, Classifier, ClassifyError};
use visadex_api::services::enrichment::{EnrichmentController, EnrichmentSettings};
use visadex_api::services::{CityGenerator, CountryLoader, OpenAiClient};
use visadex_api::{build_router, AppState};
use visadex_common::db::models::VisaStatus;

/// Classifier that stalls, keeping a started loop visibly running
struct SlowClassifier;

#[async_trait]
impl Classifier for SlowClassifier {
    async fn classify(
        &self,
        _passport: &str,
        _destination: &str,
    ) -> Result<Classification, ClassifyError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Classification {
            status: VisaStatus::VisaFree,
            notes: String::new(),
        })
    }
}

async fn test_app_state() -> AppState {
    let db_pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    visadex_common::db::init_tables(&db_pool).await.unwrap();

    let store = Arc::new(SqliteVisaStore::new(db_pool.clone()));
    let enrichment = Arc::new(EnrichmentController::new(
        store,
        Arc::new(SlowClassifier),
        EnrichmentSettings {
            interval: Duration::from_secs(60),
            batch_limit: 150,
        },
    ));

    let country_loader = Arc::new(CountryLoader::new().unwrap());
    let city_generator = Arc::new(CityGenerator::new(
        OpenAiClient::new("sk-test".to_string()).unwrap(),
    ));

    AppState::new(db_pool, enrichment, country_loader, city_generator)
}

async fn seed_pairs(state: &AppState, names: &[&str]) {
    for name in names {
        sqlx::query("INSERT INTO countries (name) VALUES (?)")
            .bind(name)
            .execute(&state.db)
            .await
            .unwrap();
    }
    visadex_api::db::visa_status::materialize_pairs(&state.db)
        .await
        .unwrap();
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_module_and_loop_state() {
    let state = test_app_state().await;
    let app = build_router(state);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "visadex-api");
    assert_eq!(json["enrichment_running"], false);
}

#[tokio::test]
async fn test_start_with_unknown_scope_is_404_and_loop_stays_idle() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR"]).await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post("/visas/enrichment/start?country=Wakanda"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");

    assert!(!state.enrichment.is_running().await, "Loop must stay idle");
}

#[tokio::test]
async fn test_double_start_returns_already_running() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR"]).await;
    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(post("/visas/enrichment/start"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Visa status update started!");

    let response = app
        .clone()
        .oneshot(post("/visas/enrichment/start"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["message"], "Already running!");

    let response = app
        .oneshot(post("/visas/enrichment/stop"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["message"], "Visa status update stopped!");
}

#[tokio::test]
async fn test_scoped_start_message_names_country() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR"]).await;
    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(post("/visas/enrichment/start?country=US"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["message"], "Visa status update started for US!");

    app.oneshot(post("/visas/enrichment/stop")).await.unwrap();
}

#[tokio::test]
async fn test_stop_when_idle_is_informational() {
    let state = test_app_state().await;
    let app = build_router(state);

    let response = app.oneshot(post("/visas/enrichment/stop")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "No active visa status update running.");
}

#[tokio::test]
async fn test_status_lookup_by_names() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR"]).await;

    let record = visadex_api::db::visa_status::find_by_names(&state.db, "US", "FR")
        .await
        .unwrap()
        .unwrap();
    visadex_api::db::visa_status::persist_status(&state.db, record.id, VisaStatus::VisaFree, "90 days")
        .await
        .unwrap();

    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(get("/visas/status?passport=US&destination=FR"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["passport"], "US");
    assert_eq!(json["destination"], "FR");
    assert_eq!(json["status"], "VISA_FREE");
    assert_eq!(json["notes"], "90 days");

    let response = app
        .oneshot(get("/visas/status?passport=US&destination=Wakanda"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_pagination_metadata() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR", "JP"]).await;

    for id in 1..=4 {
        visadex_api::db::visa_status::persist_status(&state.db, id, VisaStatus::EVisa, "")
            .await
            .unwrap();
    }

    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(get("/visas/all?page=1&page_size=3"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total_records"], 4);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["page_size"], 3);
    assert_eq!(json["data"].as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(get("/visas/all?include_unresolved=true"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total_records"], 6);

    let response = app.oneshot(get("/visas/all?page=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_update_rejects_non_canonical_status() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR"]).await;
    let app = build_router(state);

    let request = Request::builder()
        .method("PUT")
        .uri("/visas/status/1")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"status":"VISA-FREE","notes":""}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("PUT")
        .uri("/visas/status/1")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"status":"E_VISA","notes":"apply online"}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("PUT")
        .uri("/visas/status/999")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"status":"E_VISA"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_valid_passports_lists_resolved_only() {
    let state = test_app_state().await;
    seed_pairs(&state, &["US", "FR"]).await;

    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(get("/visas/valid-passports"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 0);

    let record = visadex_api::db::visa_status::find_by_names(&state.db, "US", "FR")
        .await
        .unwrap()
        .unwrap();
    visadex_api::db::visa_status::persist_status(&state.db, record.id, VisaStatus::VisaFree, "")
        .await
        .unwrap();

    let response = app.oneshot(get("/visas/valid-passports")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["name"], "US");
}
