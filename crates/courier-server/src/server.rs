use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use courier_files::FileStore;
use tower_http::cors::CorsLayer;

use crate::client::{self, ClientRegistry};
use crate::files_api;
use crate::relay::Relay;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    pub files_dir: PathBuf,
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            files_dir: PathBuf::from("files"),
            max_send_queue: 256,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub relay: Arc<Relay>,
    pub store: Arc<FileStore>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/files", get(files_api::list_files))
        .route("/api/file-info/{filename}", get(files_api::file_info))
        .route("/api/download/{filename}", get(files_api::download))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle holding the bound port.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ClientRegistry::new(config.max_send_queue));
    let relay = Arc::new(Relay::new(Arc::clone(&registry)));
    let store = Arc::new(FileStore::new(config.files_dir));

    let sweep = client::start_sweep_task(Arc::clone(&registry), SWEEP_INTERVAL);

    let state = AppState {
        registry: Arc::clone(&registry),
        relay,
        store,
    };
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "courier server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        registry,
        _server: server,
        _sweep: sweep,
    })
}

/// Handle returned by `start()`. Keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    pub registry: Arc<ClientRegistry>,
    _server: tokio::task::JoinHandle<()>,
    _sweep: tokio::task::JoinHandle<()>,
}

/// WebSocket upgrade handler: Connecting → Connected happens here.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (client_id, rx) = state.registry.register();
    tracing::info!(
        client_id = %client_id,
        connected = state.registry.count(),
        "Client connected"
    );

    client::handle_socket(socket, client_id, rx, state.registry, state.relay).await;
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "connectedClients": state.registry.count(),
    }))
}
