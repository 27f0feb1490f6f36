//! Serve command: the prediction endpoints over HTTP.
//!
//! Artifacts load on a blocking thread while the listeners are already
//! accepting; until loading finishes every prediction answers 503 and
//! `/health` reports `loading`.

pub(crate) mod handlers;
pub(crate) mod types;


pub(crate) use types::{ServerConfig, ServiceKind};

use crate::error::{CliError, Result};
use colored::Colorize;
use dpe_predict::serving::{
    ArtifactSet, ClassifierService, PredictionService, Predictor, RegressorService,
};
use handlers::{build_router, PREDICT_CONSO_ROUTE, PREDICT_DPE_ROUTE};
use std::path::Path;
use types::ServerMetrics;

/// Serve command entry point (blocking)
pub(crate) fn run(model_dir: &Path, kind: ServiceKind, config: &ServerConfig) -> Result<()> {
    println!("{}", "=== DPE Serve ===".cyan().bold());
    println!();
    println!("Models: {}", model_dir.display());
    println!(
        "Alignment: {}, unknown categories: {}",
        if config.strict { "strict" } else { "lenient" },
        config
            .unknown_policy
            .map_or_else(|| "from encoder config".to_string(), |p| format!("{p:?}"))
    );

    if !model_dir.is_dir() {
        return Err(CliError::FileNotFound(model_dir.to_path_buf()));
    }

    println!();
    println!("{}", "Endpoints:".green().bold());
    if kind.classifier() {
        println!(
            "  POST {PREDICT_DPE_ROUTE}    - DPE class ({})",
            config.bind_addr(config.classifier_port)
        );
    }
    if kind.regressor() {
        println!(
            "  POST {PREDICT_CONSO_ROUTE}  - consumption ({})",
            config.bind_addr(config.regressor_port)
        );
    }
    println!("  GET  /health        - readiness");
    if config.metrics {
        println!("  GET  /metrics       - Prometheus metrics");
    }
    println!();
    println!("{}", "Press Ctrl+C to stop".dimmed());

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Server(format!("Failed to create runtime: {e}")))?;

    let artifacts = ArtifactSet::new(model_dir);
    runtime.block_on(async move {
        let mut servers = tokio::task::JoinSet::new();

        if kind.classifier() {
            let service = ClassifierService::new();
            let loader = artifacts.clone();
            let options = config.load_options();
            spawn_loader(&service, move || loader.load_classifier(options));
            let app = build_router(PREDICT_DPE_ROUTE, service, ServerMetrics::new(), config.metrics);
            servers.spawn(serve(config.bind_addr(config.classifier_port), app));
        }

        if kind.regressor() {
            let service = RegressorService::new();
            let loader = artifacts.clone();
            let options = config.load_options();
            spawn_loader(&service, move || loader.load_regressor(options));
            let app = build_router(PREDICT_CONSO_ROUTE, service, ServerMetrics::new(), config.metrics);
            servers.spawn(serve(config.bind_addr(config.regressor_port), app));
        }

        while let Some(joined) = servers.join_next().await {
            joined.map_err(|e| CliError::Server(format!("Server task failed: {e}")))??;
        }

        println!();
        println!("{}", "Server stopped".yellow());
        Ok::<(), CliError>(())
    })
}

/// Load artifacts for `service` off the async runtime.
fn spawn_loader<P, F>(service: &PredictionService<P>, load: F)
where
    P: Predictor,
    F: FnOnce() -> dpe_predict::Result<P> + Send + 'static,
{
    let slot = std::sync::Arc::clone(service.slot());
    tokio::task::spawn_blocking(move || {
        let state = slot.load_with(load);
        tracing::info!(slot = slot.name(), %state, "artifact loading finished");
    });
}

async fn serve(bind_addr: String, app: axum::Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind {bind_addr}: {e}")))?;

    println!("{}", format!("Listening on http://{bind_addr}").green().bold());
    tracing::info!(%bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
