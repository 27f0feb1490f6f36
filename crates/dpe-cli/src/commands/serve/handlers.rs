//! HTTP handlers and router construction

use super::types::{ApiError, HealthResponse, ServerMetrics};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dpe_predict::error::ErrorKind;
use dpe_predict::serving::{PredictionService, Predictor};
use dpe_predict::DpeError;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Route of the DPE class endpoint
pub(crate) const PREDICT_DPE_ROUTE: &str = "/predict_dpe";
/// Route of the consumption endpoint
pub(crate) const PREDICT_CONSO_ROUTE: &str = "/predict_conso";

/// Per-endpoint handler state
pub(crate) struct AppState<P> {
    pub service: PredictionService<P>,
    pub metrics: Arc<ServerMetrics>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Build the router for one prediction endpoint.
///
/// `/health` and (optionally) `/metrics` report on this endpoint's model only.
pub(crate) fn build_router<P: Predictor>(
    route: &str,
    service: PredictionService<P>,
    metrics: Arc<ServerMetrics>,
    with_metrics: bool,
) -> Router {
    let mut router = Router::new()
        .route(route, post(predict::<P>))
        .route("/health", get(health::<P>));
    if with_metrics {
        router = router.route("/metrics", get(metrics_text::<P>));
    }
    router
        .with_state(AppState { service, metrics })
        .layer(TraceLayer::new_for_http())
}

async fn predict<P: Predictor>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Result<Json<P::Response>, ApiError> {
    let start = Instant::now();
    let outcome = serde_json::from_slice::<serde_json::Value>(&body)
        .map_err(|e| DpeError::invalid_input("<body>", format!("not valid JSON: {e}")))
        .and_then(|value| state.service.predict_json(&value));

    match outcome {
        Ok(response) => {
            let elapsed = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
            state.metrics.record_success(P::dropped_count(&response), elapsed);
            Ok(Json(response))
        }
        Err(err) => {
            let kind = err.kind();
            state.metrics.record_error(kind);
            match kind {
                ErrorKind::PredictionError => {
                    tracing::error!(service = P::NAME, error = %err, "prediction failed");
                }
                _ => tracing::debug!(service = P::NAME, error = %err, "request rejected"),
            }
            Err(ApiError(err))
        }
    }
}

async fn health<P: Predictor>(State(state): State<AppState<P>>) -> impl IntoResponse {
    let body = HealthResponse::from_state(state.service.state());
    let status = if body.model_loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn metrics_text<P: Predictor>(State(state): State<AppState<P>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.prometheus_output(P::NAME, state.service.state()),
    )
}
