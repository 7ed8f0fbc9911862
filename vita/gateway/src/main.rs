//! HTTP gateway binary: wires the risk runtime, profile store, and
//! telemetry together and serves the prediction API.

use std::{fs, sync::Arc};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::json;
use shared_event_bus::MemoryEventBus;
use shared_logging::LogLevel;
use tower_http::cors::CorsLayer;
use vita_profiles::ProfileStore;
use vita_risk::{RiskRuntime, RiskTelemetry};

mod config;
mod error;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env();
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let bus = Arc::new(MemoryEventBus::new(256));
    let telemetry = RiskTelemetry::builder("risk-gateway")
        .log_path(config.data_dir.join("logs/risk.log.jsonl"))
        .event_publisher(bus)
        .build()
        .context("initializing telemetry")?;

    let store = ProfileStore::open(&config.db_path)
        .with_context(|| format!("opening profile store {}", config.db_path.display()))?;

    let runtime = Arc::new(
        RiskRuntime::builder()
            .artifact_dir(config.data_dir.join("model"))
            .telemetry(telemetry.clone())
            .build(),
    );

    // Warm the artifact before accepting traffic; trains synchronously
    // when nothing is persisted yet.
    {
        let runtime = Arc::clone(&runtime);
        tokio::task::spawn_blocking(move || runtime.ensure_loaded().map(|_| ()))
            .await
            .context("artifact warmup task failed")??;
    }

    let state = AppState {
        runtime,
        profiles: Arc::new(Mutex::new(store)),
    };
    let app = routes::router(state).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    telemetry.log(
        LogLevel::Info,
        "gateway_listening",
        json!({ "addr": addr }),
    )?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}
