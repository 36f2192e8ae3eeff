use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    engine::PhishingEngine,
    error::AppError,
    types::{ExtractResponse, PredictResponse, UrlRequest},
};

pub type AppState = Arc<PhishingEngine>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/extract", post(extract))
        .route("/predict", post(predict))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn extract(
    State(engine): State<AppState>,
    Json(payload): Json<UrlRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let start_time = Instant::now();
    let response = engine.extract(&payload.url).await?;

    info!(
        "Extracted features for {} in {:.1}ms",
        payload.url,
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(Json(response))
}

pub async fn predict(
    State(engine): State<AppState>,
    Json(payload): Json<UrlRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    let start_time = Instant::now();
    let response = engine.predict(&payload.url).await?;

    info!(
        "Scored {} as {} in {:.1}ms",
        payload.url,
        if response.phishing { "phishing" } else { "legitimate" },
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(Json(response))
}

pub async fn health_check(State(engine): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": engine.has_classifier(),
    }))
}
