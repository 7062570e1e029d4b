use anyhow::Context;
use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use clap::Parser;
use common::{
    aws_logging,
    db_client::{self, DBClient},
    load_settings_from_s3, parameter_store,
    settings::SettingsReader,
};
use models::settings::Settings;
use serde_json::to_string;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod dart;
mod models;
mod service;

use dart::DartClient;

const S3_BUCKET_PARAM: &str = "S3_BUCKET_FINANCE";
const S3_STORED_SETTINGS: &str = "settings.json";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    settings: Option<String>,
}

pub(crate) struct AppState {
    db: DBClient,
    dart: Option<DartClient>,
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {e}");
            let _ = signal::ctrl_c().await;
            cancel_token.cancel();
            return;
        }
    };

    tokio::select! {
        _ = cancel_token.cancelled() => {}
        _ = sigterm.recv() => {}
        _ = signal::ctrl_c() => {}
    }
    info!("Graceful shutdown initiated");
    cancel_token.cancel();
}

async fn dart_client(settings: &Settings) -> Option<DartClient> {
    let api_key = match parameter_store::resolve(&settings.dart.api_key_param, true).await {
        Ok(key) => key,
        Err(e) => {
            warn!("Filing API key unavailable, serving stored statements only: {e:#}");
            return None;
        }
    };

    match DartClient::new(&settings.dart.base_url, api_key) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Failed to build filing API client: {e}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmdline_args = Args::parse();
    let settings = match cmdline_args.settings {
        Some(settings) => SettingsReader::read_config_file::<Settings>(&settings)?,
        None => load_settings_from_s3::<Settings>(S3_BUCKET_PARAM, S3_STORED_SETTINGS).await,
    };

    aws_logging::init_logger(&settings.logging).context("Failed to start logging")?;

    let version = env!("CARGO_PKG_VERSION");

    info!("___/********Finance Service v{}********\\___", version);

    info!(
        "Settings: {}",
        &to_string(&settings).context("Failed to serialize settings")?
    );

    let db = db_client::startup_db(&settings.database).await;
    sqlx::migrate!("./migrations")
        .run(&db.pool)
        .await
        .context("Failed to run migrations")?;

    let dart = dart_client(&settings).await;
    let state = Arc::new(AppState { db, dart });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api = Router::new()
        .route("/financial", post(service::financial))
        .route(
            "/companies",
            get(service::companies).post(service::save_company),
        )
        .route("/companies/{corp_code}", get(service::company))
        .route("/metrics/{corp_code}", get(service::corp_metrics))
        .route("/metrics/{corp_code}/{year}", get(service::year_metrics))
        .route("/health", get(service::health));

    let app = Router::new()
        .nest("/e/fin", api)
        .with_state(state)
        .layer(cors);

    let addr = format!("{}:{}", settings.listen.host, settings.listen.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("listening on {}", listener.local_addr()?);

    let cancel_token = CancellationToken::new();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await
        .context("Server error")?;

    info!("Finance service stopped");
    Ok(())
}
