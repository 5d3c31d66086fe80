//! Development server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use trowel_pipeline::{Pipeline, PipelineConfig, PipelineError};

use crate::watcher::{FileWatcher, WatchEvent, WatchRules};
use crate::websocket::{
    client_script, inject_client, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH,
    RELOAD_SOCKET_PATH,
};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Project layout; the source tree is what gets served
    pub pipeline: PipelineConfig,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    AddressError(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Shared server state.
struct ServerState {
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Compile sources, then serve them with live reload until shut down.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::AddressError(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let pipeline = Pipeline::new(self.config.pipeline.clone());

        // A broken source should not keep the server from starting.
        if let Err(e) = pipeline.compile().await {
            tracing::error!("Initial build failed: {}", e);
        }

        let state = Arc::new(ServerState {
            hub: ReloadHub::new(),
        });

        let rules = WatchRules::new(pipeline.config());
        let (watcher, mut rx) =
            FileWatcher::new(rules).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let hub = state.hub.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&pipeline, &hub, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(&self.config, state);

        tracing::info!("Starting dev server at http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

fn router(config: &DevServerConfig, state: Arc<ServerState>) -> Router {
    Router::new()
        .route(RELOAD_SOCKET_PATH, get(ws_handler))
        .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
        .fallback_service(ServeDir::new(&config.pipeline.src_dir))
        .layer(middleware::from_fn(inject_reload_client))
        .with_state(state)
}

/// Rebuild what a change affects and tell browsers how to refresh.
async fn handle_watch_event(pipeline: &Pipeline, hub: &ReloadHub, event: WatchEvent) {
    tracing::debug!("Change detected: {:?}", event);

    for task in event.tasks() {
        if let Err(e) = pipeline.run(task).await {
            tracing::error!("[{}] {}", task, e);
            hub.send(ReloadMessage::BuildFailed {
                task: task.to_string(),
                message: e.to_string(),
            });
            return;
        }
    }

    hub.send(reload_for(event));
}

/// Stylesheets refresh in place; everything else reloads the page.
fn reload_for(event: WatchEvent) -> ReloadMessage {
    match event {
        WatchEvent::Styles => ReloadMessage::ReloadStyles,
        _ => ReloadMessage::Reload,
    }
}

/// Add the live reload client to every HTML response.
async fn inject_reload_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer HTML response: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    // Forward reload messages to the client
    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Handler for the live reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/javascript"),
        )],
        client_script(),
    )
}
