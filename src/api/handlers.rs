//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    error::SustainError,
    observability::MetricsCollector,
    optimizer::Co2Report,
    pipeline::{OptimizationPipeline, SustainResponse},
};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<OptimizationPipeline>,
    pub metrics: Arc<MetricsCollector>,
}

/// Body of `POST /api/sustain`. Fields stay untyped so a non-string `userInput`
/// is reported as invalid input rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainRequest {
    #[serde(default)]
    pub user_input: Option<Value>,
    #[serde(default)]
    pub model: Option<Value>,
}

impl SustainRequest {
    pub fn user_input(&self) -> Option<&str> {
        self.user_input.as_ref().and_then(Value::as_str)
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_ref().and_then(Value::as_str)
    }
}

/// Optimize a prompt and answer it
pub async fn sustain(
    State(state): State<AppState>,
    payload: Result<Json<SustainRequest>, JsonRejection>,
) -> Result<Json<SustainResponse>, SustainError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("sustain_request", %request_id);

    async move {
        let request = match payload {
            Ok(Json(request)) => request,
            Err(rejection) => {
                warn!("Rejected request body: {}", rejection.body_text());
                SustainRequest::default()
            }
        };

        let response = state
            .pipeline
            .process(request.user_input(), request.model())
            .await?;
        Ok(Json(response))
    }
    .instrument(span)
    .await
}

/// Liveness message
pub async fn status() -> impl IntoResponse {
    Json(json!({ "message": "SUSTAIN API is running!" }))
}

/// Running CO2 savings report
pub async fn co2_savings(State(state): State<AppState>) -> Json<Co2Report> {
    Json(state.pipeline.accountant().co2_report())
}

/// Prometheus metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .export_prometheus(state.pipeline.accountant().total_tokens_saved())
}
