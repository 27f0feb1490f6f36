//! Server configuration, metrics and wire types for the serve command

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dpe_predict::encoding::{AlignMode, UnknownPolicy};
use dpe_predict::error::ErrorKind;
use dpe_predict::serving::{LoadOptions, ModelState};
use dpe_predict::DpeError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Which prediction endpoints to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ServiceKind {
    /// `POST /predict_dpe` only
    Classifier,
    /// `POST /predict_conso` only
    Regressor,
    /// Both, each on its own port
    Both,
}

impl ServiceKind {
    pub(crate) fn classifier(self) -> bool {
        matches!(self, Self::Classifier | Self::Both)
    }

    pub(crate) fn regressor(self) -> bool {
        matches!(self, Self::Regressor | Self::Both)
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port of the DPE class endpoint
    pub classifier_port: u16,
    /// Port of the consumption endpoint
    pub regressor_port: u16,
    /// Report dropped columns instead of ignoring them
    pub strict: bool,
    /// Unknown-category policy override; `None` keeps the encoder config's own
    pub unknown_policy: Option<UnknownPolicy>,
    /// Enable Prometheus metrics endpoint
    pub metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            classifier_port: 5001,
            regressor_port: 5000,
            strict: false,
            unknown_policy: None,
            metrics: true,
        }
    }
}

impl ServerConfig {
    /// Set the host
    pub(crate) fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set both ports
    pub(crate) fn with_ports(mut self, classifier: u16, regressor: u16) -> Self {
        self.classifier_port = classifier;
        self.regressor_port = regressor;
        self
    }

    /// Toggle strict alignment
    pub(crate) fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the unknown-category policy
    pub(crate) fn with_unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown_policy = Some(policy);
        self
    }

    /// Toggle `/metrics`
    pub(crate) fn with_metrics(mut self, metrics: bool) -> Self {
        self.metrics = metrics;
        self
    }

    /// Options handed to the artifact loader
    pub(crate) fn load_options(&self) -> LoadOptions {
        let mode = if self.strict {
            AlignMode::Strict
        } else {
            AlignMode::Lenient
        };
        let options = LoadOptions::default().with_align_mode(mode);
        match self.unknown_policy {
            Some(policy) => options.with_unknown_policy(policy),
            None => options,
        }
    }

    /// Get bind address
    pub(crate) fn bind_addr(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }
}

/// Server metrics (thread-safe)
///
/// One instance per endpoint; exposed via `/metrics`.
#[derive(Debug, Default)]
pub(crate) struct ServerMetrics {
    /// Total prediction requests received
    pub requests_total: AtomicU64,
    /// Successful requests (2xx)
    pub requests_success: AtomicU64,
    /// Client errors (4xx)
    pub requests_client_error: AtomicU64,
    /// Server errors (500)
    pub requests_server_error: AtomicU64,
    /// Requests refused while the model wasn't ready (503)
    pub requests_unavailable: AtomicU64,
    /// Encoded columns dropped by strict alignment
    pub dropped_columns: AtomicU64,
    /// Total prediction time in microseconds
    pub inference_time_us: AtomicU64,
    start_time: OnceLock<Instant>,
}

impl ServerMetrics {
    /// Create new metrics with server start time
    pub(crate) fn new() -> Arc<Self> {
        let metrics = Arc::new(Self::default());
        let _ = metrics.start_time.set(Instant::now());
        metrics
    }

    /// Record a successful prediction
    pub(crate) fn record_success(&self, dropped: usize, duration_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_success.fetch_add(1, Ordering::Relaxed);
        self.dropped_columns.fetch_add(dropped as u64, Ordering::Relaxed);
        self.inference_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record a failed prediction by its error kind
    pub(crate) fn record_error(&self, kind: ErrorKind) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            ErrorKind::InvalidInput | ErrorKind::UnrecognizedCategory => &self.requests_client_error,
            ErrorKind::ServiceUnavailable => &self.requests_unavailable,
            ErrorKind::PredictionError => &self.requests_server_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub(crate) fn uptime_seconds(&self) -> u64 {
        self.start_time.get().map_or(0, |t| t.elapsed().as_secs())
    }

    /// Get Prometheus-format metrics
    pub(crate) fn prometheus_output(&self, service: &str, state: ModelState) -> String {
        let total = self.requests_total.load(Ordering::Relaxed);
        let success = self.requests_success.load(Ordering::Relaxed);
        let client_errors = self.requests_client_error.load(Ordering::Relaxed);
        let server_errors = self.requests_server_error.load(Ordering::Relaxed);
        let unavailable = self.requests_unavailable.load(Ordering::Relaxed);
        let dropped = self.dropped_columns.load(Ordering::Relaxed);
        let inference_us = self.inference_time_us.load(Ordering::Relaxed);
        let ready = u8::from(state == ModelState::Ready);
        let uptime = self.uptime_seconds();

        format!(
            r#"# HELP dpe_requests_total Total number of prediction requests
# TYPE dpe_requests_total counter
dpe_requests_total{{service="{service}"}} {total}

# HELP dpe_requests_success Successful requests (2xx)
# TYPE dpe_requests_success counter
dpe_requests_success{{service="{service}"}} {success}

# HELP dpe_requests_client_error Client error requests (4xx)
# TYPE dpe_requests_client_error counter
dpe_requests_client_error{{service="{service}"}} {client_errors}

# HELP dpe_requests_server_error Server error requests (500)
# TYPE dpe_requests_server_error counter
dpe_requests_server_error{{service="{service}"}} {server_errors}

# HELP dpe_requests_unavailable Requests refused before the model was ready (503)
# TYPE dpe_requests_unavailable counter
dpe_requests_unavailable{{service="{service}"}} {unavailable}

# HELP dpe_dropped_columns_total Encoded columns missing from the training schema
# TYPE dpe_dropped_columns_total counter
dpe_dropped_columns_total{{service="{service}"}} {dropped}

# HELP dpe_inference_duration_seconds_total Total prediction time in seconds
# TYPE dpe_inference_duration_seconds_total counter
dpe_inference_duration_seconds_total{{service="{service}"}} {:.6}

# HELP dpe_model_ready Whether the model is loaded
# TYPE dpe_model_ready gauge
dpe_model_ready{{service="{service}"}} {ready}

# HELP dpe_uptime_seconds Server uptime in seconds
# TYPE dpe_uptime_seconds gauge
dpe_uptime_seconds{{service="{service}"}} {uptime}
"#,
            inference_us as f64 / 1_000_000.0
        )
    }
}

/// `GET /health` body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct HealthResponse {
    /// `"ready"` or `"not ready"`
    pub status: String,
    /// True once artifacts are loaded
    pub model_loaded: bool,
    /// Readiness state in detail
    pub state: String,
}

impl HealthResponse {
    pub(crate) fn from_state(state: ModelState) -> Self {
        let ready = state == ModelState::Ready;
        Self {
            status: if ready { "ready" } else { "not ready" }.to_string(),
            model_loaded: ready,
            state: state.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    /// Stable error code
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Present (and false) on 503 responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_loaded: Option<bool>,
}

impl ErrorResponse {
    /// Create a new error response
    pub(crate) fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            model_loaded: None,
        }
    }
}

/// A library error on its way to becoming an HTTP response.
#[derive(Debug)]
pub(crate) struct ApiError(pub DpeError);

impl From<DpeError> for ApiError {
    fn from(e: DpeError) -> Self {
        Self(e)
    }
}

impl ApiError {
    /// Status code and stable error code for this error
    pub(crate) fn status(&self) -> (StatusCode, &'static str) {
        match self.0.kind() {
            ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "invalid_input"),
            ErrorKind::UnrecognizedCategory => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unrecognized_category")
            }
            ErrorKind::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ErrorKind::PredictionError => (StatusCode::INTERNAL_SERVER_ERROR, "prediction_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let mut body = match status {
            // Internal details stay in the logs.
            StatusCode::INTERNAL_SERVER_ERROR => ErrorResponse::new(code, "prediction failed"),
            _ => ErrorResponse::new(code, self.0.to_string()),
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            body.model_loaded = Some(false);
        }
        (status, Json(body)).into_response()
    }
}
