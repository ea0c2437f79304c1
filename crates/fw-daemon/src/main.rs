//! fw-daemon entry point.
//!
//! Thin: load config, resolve storage URLs, wire Postgres + Redis into the
//! engine services, attach middleware, serve. Route handlers live in
//! `routes.rs`; shared state in `state.rs`.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context};
use axum::http::{HeaderValue, Method};
use fw_config::{load_layered_yaml, resolve_storage_urls, FleetSettings};
use fw_daemon::{routes, state};
use fw_db::{PgIncidentSink, PgShiftStore, RedisViolationCounter};
use fw_integrity::IntegrityMonitor;
use fw_schemas::{Clock, SystemClock};
use fw_shift::ShiftLifecycle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Comma-separated YAML layers, later ones override earlier ones.
const ENV_CONFIG_PATHS: &str = "FW_CONFIG_PATHS";
const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    let settings = FleetSettings::from_loaded(&loaded)?;
    info!(config_hash = %loaded.config_hash, layers = ?paths, "config loaded");

    let urls = resolve_storage_urls(&settings)?;
    let Some(redis_url) = urls.redis_url.as_deref() else {
        bail!(
            "SECRET_MISSING env var {} is not set",
            settings.storage.redis_url_env
        );
    };

    let pool = fw_db::connect(&urls.database_url, settings.io_timeout()).await?;
    if !fw_db::status(&pool).await?.has_shifts_table {
        bail!("database schema missing; run `fw db migrate` first");
    }

    let tz = settings.timezone()?;
    let io_timeout = settings.io_timeout();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let lifecycle = ShiftLifecycle::new(Arc::new(PgShiftStore::new(pool.clone())), clock.clone())
        .with_timezone(tz)
        .with_io_timeout(io_timeout);
    let counter = RedisViolationCounter::new(redis_url).context("redis pool setup failed")?;
    let integrity = IntegrityMonitor::new(Arc::new(counter), Arc::new(PgIncidentSink::new(pool)), clock)
        .with_io_timeout(io_timeout);

    let shared = Arc::new(state::AppState::new(lifecycle, integrity));
    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(5));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = settings.bind_addr()?;
    info!(timezone = %tz, "fw-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn config_paths() -> Vec<String> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
