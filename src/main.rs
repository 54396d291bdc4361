use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use clap_serde_derive::ClapSerde;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analysis::clause::ClauseSet;
use crate::analysis::pipeline::AnalysisPipeline;
use crate::analysis::provider::OpenRouterClient;
use crate::analysis::request::AnalysisRequest;
use crate::config::Config;
use crate::error::{handle_panic, ApiResult};
use crate::telemetry::{init_telemetry, shutdown_telemetry};

mod analysis;
mod config;
mod error;
mod telemetry;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const DEFAULT_CONFIG_FILE: &str = "ClauseAnalyzer.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<AnalysisPipeline>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(err) => {
            if args.config_file == DEFAULT_CONFIG_FILE {
                Config::default().merge(args.opt_config)
            } else {
                return Err(err.context(format!(
                    "Failed to read configuration file {}",
                    args.config_file
                )));
            }
        }
    };
    init_telemetry(&config.otlp_endpoint, config.console)?;

    let settings = config.provider_settings();
    if settings.api_key.is_none() {
        warn!("OPENROUTER_API_KEY is not set, every analysis will report a configuration error");
    }
    let client = OpenRouterClient::new(config.api_url()?, config.request_timeout())?;
    let state = AppState {
        pipeline: Arc::new(AnalysisPipeline::new(Arc::new(client), settings)),
    };

    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    info!(model = %config.model, endpoint = %config.api_url, "Forwarding analyses");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    shutdown_telemetry();
    Ok(())
}

fn router(state: AppState) -> Router {
    with_layers(
        Router::new()
            .route("/analyze-clauses", post(handle_analyze_clauses))
            .route("/health", get(handle_health)),
    )
    .with_state(state)
}

fn with_layers(routes: Router<AppState>) -> Router<AppState> {
    routes
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

#[axum_macros::debug_handler]
async fn handle_analyze_clauses(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ClauseSet>)> {
    let request = match AnalysisRequest::from_body(&body) {
        Ok(request) => request,
        Err(err) => bail_api!(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let clauses = state.pipeline.analyze(&request.legal_text).await;
    Ok((StatusCode::OK, Json(clauses)))
}

async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
