use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;

use crate::bounds::BoundAnalysis;
use crate::config::GeneratorConfig;
use crate::diagnostics::DiagnosticsReport;
use crate::error::GenerateError;
use crate::generator::{GenerationResult, TimetableGenerator};
use crate::store::SnapshotDocument;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub snapshot: SnapshotDocument,
    #[serde(default)]
    pub config: Option<GeneratorConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub snapshot: SnapshotDocument,
}

type ApiError = (StatusCode, String);

fn reject(e: GenerateError) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

/// Runs CPU-bound work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GenerateError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(reject),
        Err(e) => {
            error!("generation task failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn generate_handler(
    State(defaults): State<Arc<GeneratorConfig>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerationResult>, ApiError> {
    let config = request.config.unwrap_or_else(|| (*defaults).clone());
    blocking(move || TimetableGenerator::new(config)?.generate(&request.snapshot))
        .await
        .map(Json)
}

async fn analyze_handler(
    State(defaults): State<Arc<GeneratorConfig>>,
    Json(request): Json<SnapshotRequest>,
) -> Result<Json<BoundAnalysis>, ApiError> {
    let config = (*defaults).clone();
    blocking(move || TimetableGenerator::new(config)?.analyze(&request.snapshot))
        .await
        .map(Json)
}

async fn diagnostics_handler(
    State(defaults): State<Arc<GeneratorConfig>>,
    Json(request): Json<SnapshotRequest>,
) -> Result<Json<DiagnosticsReport>, ApiError> {
    let config = (*defaults).clone();
    blocking(move || TimetableGenerator::new(config)?.diagnose(&request.snapshot))
        .await
        .map(Json)
}

pub fn router(defaults: GeneratorConfig) -> Router {
    Router::new()
        .route("/v1/timetable/generate", post(generate_handler))
        .route("/v1/timetable/analyze", post(analyze_handler))
        .route("/v1/timetable/diagnostics", post(diagnostics_handler))
        .with_state(Arc::new(defaults))
}

pub async fn run_server(addr: &str, defaults: GeneratorConfig) -> std::io::Result<()> {
    let app = router(defaults);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
