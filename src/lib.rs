pub mod types;
pub mod error;
pub mod config;
pub mod draw;
pub mod tournament;
pub mod presentation;
pub mod spin;
pub mod render;
pub mod cancel;
pub mod roster;
pub mod session;

use types::*;
use config::*;
use cancel::CancelGate;
use draw::random_source_from_seed;
use roster::{JsonRoster, RoleCache, SystemClock};
use session::WheelSession;

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use axum::{
    extract::State as AxumState,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── Overlay HTTP server ────────────────────────────────────────────────

#[derive(Clone)]
pub struct OverlayServerState {
    pub overlay: SharedOverlayState,
    pub cancel: CancelGate,
}

fn resolve_overlay_dir() -> PathBuf {
    if let Some(raw) = env_default("OVERLAY_DIR") {
        resolve_repo_path(&raw)
    } else {
        repo_root().join("overlay")
    }
}

pub fn overlay_router(state: OverlayServerState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/state.json", get(get_overlay_state_json))
        .route("/cancel", post(post_cancel))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

async fn start_overlay_server(state: OverlayServerState, static_dir: PathBuf, addr: String) {
    let app = overlay_router(state, static_dir);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("overlay server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("overlay server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("overlay server error: {e}");
    }
}

async fn get_overlay_state_json(AxumState(state): AxumState<OverlayServerState>) -> impl IntoResponse {
    let payload = {
        let guard = state.overlay.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    };
    let body = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
}

async fn post_cancel(AxumState(state): AxumState<OverlayServerState>) -> impl IntoResponse {
    state.cancel.cancel();
    "cancelled"
}

fn spawn_ctrl_c_listener(cancel: CancelGate) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl+C received, stopping after the current round");
                cancel.cancel();
            }
            Err(e) => error!("listening for Ctrl+C failed: {e}"),
        }
    });
}

// ── Entry point ────────────────────────────────────────────────────────

pub async fn run() {
    load_env_file();

    // Initialize tracing with rolling file output
    let logs_dir = logs_dir();
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "wheel.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Wheel spin bot starting");

    ensure_config_file();
    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}; falling back to defaults");
            WheelConfig::default()
        }
    };
    log_config_warnings(&config);

    let overlay: SharedOverlayState = Arc::new(Mutex::new(OverlayState::default()));
    let cancel = CancelGate::new();
    spawn_ctrl_c_listener(cancel.clone());

    let overlay_dir = resolve_overlay_dir();
    fs::create_dir_all(&overlay_dir).ok();
    tokio::spawn(start_overlay_server(
        OverlayServerState {
            overlay: overlay.clone(),
            cancel: cancel.clone(),
        },
        overlay_dir,
        config.overlay_addr.clone(),
    ));

    let roster_path = resolve_repo_path(&config.roster_path);
    let roster = match JsonRoster::load(&roster_path) {
        Ok(roster) => roster,
        Err(e) => {
            error!("load roster {}: {e}", roster_path.display());
            return;
        }
    };
    let members = RoleCache::new(roster, SystemClock, config.role_cache_ttl_ms);
    let rng = random_source_from_seed(config.rng_seed);

    let mut session = WheelSession::new(config, members, rng, cancel, overlay);
    match session.run().await {
        Ok(report) => {
            let survivor = report
                .survivor
                .as_ref()
                .map(|p| p.label.clone())
                .unwrap_or_else(|| "none".to_string());
            info!(
                rounds = report.rounds.len(),
                cancelled = report.cancelled,
                failed_tag_updates = report.failed_tag_updates.len(),
                "wheel session done, survivor: {survivor}"
            );
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("serialize report: {e}"),
            }
        }
        Err(e) => error!("wheel session failed: {e}"),
    }
}
