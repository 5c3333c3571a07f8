//! Axum server for the channel control API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, StatusCode, Uri},
    routing::get,
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;

use crate::error::{ServiceError, StoreError};
use crate::store::StoreConnector;
use crate::tree::{ChannelPath, ChannelTreeManager};

const CREATE_COMMAND: &str = "CREATE_CHANNEL";
const REMOVE_COMMAND: &str = "REMOVE_CHANNEL";

/// Shared state for control handlers.
pub struct ControlState {
    /// Opens a fresh store session per request.
    connector: Arc<dyn StoreConnector>,
    /// Shared secret callers must present as the first path segment.
    secret: SecretString,
}

impl ControlState {
    pub fn new(connector: Arc<dyn StoreConnector>, secret: impl Into<String>) -> Self {
        Self {
            connector,
            secret: SecretString::from(secret.into()),
        }
    }
}

/// Start the control server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0) and
/// the sender that triggers graceful shutdown.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<ControlState>,
) -> Result<(SocketAddr, oneshot::Sender<()>), ServiceError> {
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::StartupFailed {
                reason: format!("failed to bind to {}: {}", addr, e),
            })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ServiceError::StartupFailed {
            reason: format!("failed to get local addr: {}", e),
        })?;

    // No access-log middleware: the per-command summaries below are the only
    // request logging.
    let app = Router::new()
        .route("/{secret}/{command}/{*path}", get(command_handler))
        .fallback(fail_handler)
        .method_not_allowed_fallback(fail_handler)
        .with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            tracing::info!("Control service shutting down");
        })
        .await
        {
            tracing::error!("Control server error: {}", e);
        }
    });

    Ok((bound_addr, shutdown_tx))
}

/// The wire answers are a bare word with this content type, nothing more.
type PlainResponse = (StatusCode, [(header::HeaderName, &'static str); 1], &'static str);

fn ok() -> PlainResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], "OK")
}

fn fail() -> PlainResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html")],
        "FAIL",
    )
}

async fn command_handler(
    State(state): State<Arc<ControlState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path((secret, command, path)): Path<(String, String, String)>,
) -> PlainResponse {
    if secret != state.secret.expose_secret() {
        tracing::info!(%peer, "Rejected request: bad secret");
        return fail();
    }

    let channel_path = ChannelPath::parse(&path);
    if channel_path.is_empty() {
        tracing::info!(%peer, %command, "Bad request: empty channel path");
        return fail();
    }

    match command.as_str() {
        CREATE_COMMAND => tracing::info!(%peer, channel = %channel_path, "Create request"),
        REMOVE_COMMAND => tracing::info!(%peer, channel = %channel_path, "Remove request"),
        _ => {
            tracing::info!(%peer, %command, "Bad request: unknown command");
            return fail();
        }
    }

    match dispatch(&state, &command, &channel_path).await {
        Ok(()) => ok(),
        Err(e) => {
            tracing::warn!(%peer, channel = %channel_path, error = %e, "Command failed");
            fail()
        }
    }
}

async fn dispatch(
    state: &ControlState,
    command: &str,
    path: &ChannelPath,
) -> Result<(), StoreError> {
    let store = state.connector.connect().await?;
    let manager = ChannelTreeManager::connect(store).await?;
    match command {
        CREATE_COMMAND => manager.get_or_create(path).await,
        _ => manager.remove(path).await,
    }
}

async fn fail_handler(ConnectInfo(peer): ConnectInfo<SocketAddr>, uri: Uri) -> PlainResponse {
    tracing::info!(%peer, path = %uri.path(), "Bad request");
    fail()
}
