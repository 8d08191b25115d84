//! Memory Forest: a personal memory journal. Plant a memory (photo, note,
//! date, feeling), browse the newest ones, watch your tree grow.
//!
//! Hosts the pages and an RPC API on the same port.
//! Default: http://127.0.0.1:9103/

mod backend;
mod client;
mod config;
mod dashboard;
mod error;
mod events;
mod feed;
mod form;
mod grove;
mod http;
mod routes;
mod session;
mod shell;
mod store;
mod tree;

#[cfg(test)]
mod testing;

use backend::Services;
use backend::local::LocalBackend;
use backend::supabase::SupabaseBackend;
use client::{ClientRegistry, ViewOptions};
use config::{BackendKind, Config};
use events::{MemoryEvent, MemoryEvents};
use routes::AppState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;

/// Request body cap; images travel in the plant request body.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const CLIENT_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().expect("Invalid configuration");

    let services = match config.backend {
        BackendKind::Supabase => {
            let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_anon_key) else {
                panic!("SUPABASE_URL and SUPABASE_ANON_KEY are required for the supabase backend");
            };
            log::info!("[FOREST] Using hosted backend at {}", url);
            Services::from_backend("supabase", Arc::new(SupabaseBackend::new(url, key, &config.bucket)))
        }
        BackendKind::Local => {
            log::info!("Opening database at: {}", config.db_path);
            std::fs::create_dir_all(&config.blob_dir).expect("Failed to create blob directory");
            let public_base = config.site_url.clone().unwrap_or_default();
            let local = LocalBackend::open(&config.db_path, &config.blob_dir, &public_base)
                .expect("Failed to open database");
            Services::from_backend("local", Arc::new(local))
        }
    };

    let events = MemoryEvents::new();
    let state = Arc::new(AppState {
        clients: ClientRegistry::new(
            services.clone(),
            events.clone(),
            ViewOptions::from(&config),
            Duration::from_secs(config.client_idle_secs),
        ),
        services,
        events: events.clone(),
        start_time: Instant::now(),
        planted: AtomicU64::new(0),
        config,
    });

    // Counts plants for /rpc/status.
    let mut planted_rx = events.subscribe();
    let counter_state = state.clone();
    tokio::spawn(async move {
        loop {
            match planted_rx.recv().await {
                Ok(MemoryEvent::Planted(memory)) => {
                    counter_state.planted.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[FOREST] Memory {} planted", memory.id);
                }
                Err(RecvError::Lagged(n)) => {
                    counter_state.planted.fetch_add(n, Ordering::Relaxed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Idle browser clients are dropped even when no new client arrives.
    let prune_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLIENT_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            prune_state.clients.prune_idle();
        }
    });

    let cors = tower_http::cors::CorsLayer::permissive();

    let mut app = axum::Router::new()
        .route("/", axum::routing::get(routes::index))
        // Entry
        .route("/auth", axum::routing::get(routes::auth_page))
        .route("/auth/sign-in", axum::routing::post(routes::sign_in))
        .route("/auth/sign-up", axum::routing::post(routes::sign_up))
        .route("/auth/sign-out", axum::routing::post(routes::sign_out))
        // Pages
        .route("/memories/plant", axum::routing::post(routes::plant_form))
        .route("/grove", axum::routing::get(routes::grove))
        .route("/grove/connect", axum::routing::post(routes::grove_connect))
        // Memories
        .route(
            "/rpc/memories/plant",
            axum::routing::post(routes::rpc_plant),
        )
        .route(
            "/rpc/memories/recent",
            axum::routing::get(routes::rpc_recent),
        )
        .route(
            "/rpc/memories/count",
            axum::routing::get(routes::rpc_count),
        )
        .route("/rpc/tree", axum::routing::get(routes::rpc_tree))
        // Service
        .route("/rpc/session", axum::routing::get(routes::rpc_session))
        .route("/rpc/status", axum::routing::get(routes::status));

    if state.config.backend == BackendKind::Local {
        app = app.nest_service(
            "/blobs",
            tower_http::services::ServeDir::new(&state.config.blob_dir),
        );
    }

    let addr = state.config.listen_addr();
    let app = app
        .with_state(state)
        .layer(axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors);

    log::info!("Memory Forest listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
