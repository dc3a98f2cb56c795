//! `BoardServer`: axum HTTP endpoint for queries and mutations, plus the
//! WebSocket subscription endpoint.

use crate::api::{Board, Response};
use crate::config::ServerConfig;
use crate::error::BoardError;
use crate::gateway::run_ws_session;
use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<Board>,
    pub config: Arc<ServerConfig>,
    pub shutdown: CancellationToken,
    pub start_time: Instant,
    next_connection: Arc<AtomicU64>,
}

/// The board server.
pub struct BoardServer {
    config: ServerConfig,
    board: Arc<Board>,
    shutdown: CancellationToken,
    start_time: Instant,
}

impl BoardServer {
    pub fn new(config: ServerConfig, board: Arc<Board>) -> Self {
        Self {
            config,
            board,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            board: self.board.clone(),
            config: Arc::new(self.config.clone()),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            next_connection: Arc::new(AtomicU64::new(1)),
        };

        Router::new()
            .route("/api", post(api_handler))
            .route("/subscriptions", get(subscriptions_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// Serve on `listener` until the shutdown token is cancelled, then close
    /// the bus so every open subscription completes.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "board server listening");

        let router = self.router();
        let token = self.shutdown.clone();
        let board = self.board.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                token.cancelled().await;
                info!("shutting down");
                board.close();
            })
            .await;

        self.board.close();
        info!("board server stopped");
        result
    }
}

/// HTTP status for an error kind.
fn status_for(err: &BoardError) -> StatusCode {
    match err {
        BoardError::Validation(_) => StatusCode::BAD_REQUEST,
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::Store(_) | BoardError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api
async fn api_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let result = state.board.handle_request(&body).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            if matches!(e, BoardError::Store(_)) {
                warn!(error = %e, "operation failed");
            }
            status_for(e)
        }
    };
    (status, Json(Response::from(result)))
}

/// GET /subscriptions
async fn subscriptions_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let n = state.next_connection.fetch_add(1, Ordering::Relaxed);
    let connection_id = format!("conn-{n}");
    let bus = state.board.bus().clone();
    let buffer = state.config.outbound_buffer;
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| run_ws_session(socket, connection_id, bus, buffer, shutdown))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub subscribers: usize,
    pub messages: Option<usize>,
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let messages = state.board.queries().count().await.ok();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        subscribers: state.board.bus().subscriber_count(),
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::service::MutationOptions;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn make_server() -> BoardServer {
        let board = Board::new(
            Arc::new(MemoryStore::new()),
            Arc::new(EventBus::default()),
            MutationOptions::default(),
        );
        BoardServer::new(ServerConfig::default(), Arc::new(board))
    }

    async fn post_api(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_post_message_ok() {
        let server = make_server();
        let (status, body) = post_api(
            server.router(),
            r#"{"op":"postMessage","user":"A","content":"hi"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "1");
        assert_eq!(body["data"]["parentId"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = make_server();

        let (status, body) = post_api(
            server.router(),
            r#"{"op":"postMessage","user":"","content":"hi"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");

        let (status, body) =
            post_api(server.router(), r#"{"op":"deleteMessage","id":"42"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not_found");

        let (status, _) = post_api(server.router(), "garbage").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = make_server();
        let _sub = server.board().subscribe(crate::bus::Topic::Added);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["subscribers"], 1);
        assert_eq!(parsed["messages"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_shutdown_token_shared() {
        let server = make_server();
        let token = server.shutdown_token();
        assert!(!token.is_cancelled());
        server.shutdown_token().cancel();
        assert!(token.is_cancelled());
    }
}
