//! Streamable HTTP transport
//!
//! Serves MCP over a single HTTP endpoint. Each POST carries one JSON-RPC
//! message and gets a plain JSON reply; server-initiated SSE streams are not
//! offered, so GET on the endpoint answers 405. Sessions are assigned on
//! `initialize` and carried in the `Mcp-Session-Id` header afterwards; a
//! session that goes quiet past the idle timeout is swept and answers 404.

use crate::config::ServerConfig;
use crate::mcp::protocol::*;
use crate::mcp::server::McpServer;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Header carrying the session id
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Header carrying the negotiated protocol version
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Upper bound on how often idle sessions are swept
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the HTTP server and run until `shutdown` resolves
#[inline]
pub async fn serve_http<F>(server: Arc<McpServer>, config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "MCP server listening on {} (endpoint {})",
        listener.local_addr()?,
        config.endpoint_path
    );

    let sweeper = spawn_session_sweeper(&server);

    let served = axum::serve(listener, router(server, &config.endpoint_path))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed");
    sweeper.abort();
    served?;

    info!("MCP server stopped");
    Ok(())
}

/// Periodically evict sessions whose clients stopped talking without a DELETE.
/// The task ends on its own once the server is dropped.
fn spawn_session_sweeper(server: &Arc<McpServer>) -> JoinHandle<()> {
    let period =
        (server.session_idle_timeout() / 2).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    let server = Arc::downgrade(server);

    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(server) = server.upgrade() else {
                break;
            };
            let evicted = server.evict_idle_sessions().await;
            if evicted > 0 {
                info!("Evicted {} idle session(s)", evicted);
            }
        }
    })
}

/// Create the MCP router
#[inline]
pub fn router(server: Arc<McpServer>, endpoint_path: &str) -> Router {
    Router::new()
        .route(
            endpoint_path,
            post(handle_post).get(handle_get).delete(handle_delete),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(server)
}

/// Health check endpoint
async fn health_check(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    Json(server.health_status().await)
}

async fn handle_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw_value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse JSON body: {}", e);
            return rpc_error(StatusCode::BAD_REQUEST, JsonRpcError::parse_error());
        }
    };

    if let Some(response) = check_protocol_version(&server, &headers) {
        return response;
    }

    let message = match server.parse_message(&raw_value) {
        Ok(message) => message,
        Err(e) => {
            warn!("Message validation failed: {}", e);
            return rpc_error(
                StatusCode::BAD_REQUEST,
                JsonRpcError::invalid_request(Some(e.to_string())),
            );
        }
    };

    let is_initialize =
        matches!(&message, JsonRpcMessage::Request(request) if request.method == "initialize");

    let session_id = if is_initialize {
        server.create_session().await
    } else {
        match require_session(&server, &headers).await {
            Ok(session_id) => session_id,
            Err(response) => return response,
        }
    };

    match server.handle_message(&session_id, message).await {
        Some(reply) => {
            if is_initialize && matches!(reply, JsonRpcMessage::ErrorResponse(_)) {
                // A failed handshake leaves nothing to resume
                server.close_session(&session_id).await;
                return (StatusCode::OK, Json(reply)).into_response();
            }
            with_session_header((StatusCode::OK, Json(reply)).into_response(), &session_id)
        }
        None => with_session_header(StatusCode::ACCEPTED.into_response(), &session_id),
    }
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
async fn handle_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, DELETE")],
    )
        .into_response()
}

async fn handle_delete(State(server): State<Arc<McpServer>>, headers: HeaderMap) -> Response {
    match require_session(&server, &headers).await {
        Ok(session_id) => {
            server.close_session(&session_id).await;
            info!("Session {} terminated by client", session_id);
            StatusCode::OK.into_response()
        }
        Err(response) => response,
    }
}

/// Resolve the session named in the request headers
async fn require_session(server: &McpServer, headers: &HeaderMap) -> Result<String, Response> {
    let Some(value) = headers.get(SESSION_ID_HEADER) else {
        debug!("Request without session id rejected");
        return Err(rpc_error(
            StatusCode::BAD_REQUEST,
            JsonRpcError::invalid_request(Some("Bad Request: Missing session ID".to_string())),
        ));
    };

    let Ok(session_id) = value.to_str() else {
        return Err(rpc_error(
            StatusCode::BAD_REQUEST,
            JsonRpcError::invalid_request(Some("Bad Request: Invalid session ID".to_string())),
        ));
    };

    if !server.touch_session(session_id).await {
        debug!("Unknown session id {}", session_id);
        return Err(rpc_error(
            StatusCode::NOT_FOUND,
            JsonRpcError::invalid_request(Some("Session not found".to_string())),
        ));
    }

    Ok(session_id.to_string())
}

fn check_protocol_version(server: &McpServer, headers: &HeaderMap) -> Option<Response> {
    let value = headers.get(PROTOCOL_VERSION_HEADER)?;
    let supported = value
        .to_str()
        .is_ok_and(|version| server.supports_protocol_version(version));

    if supported {
        None
    } else {
        Some(rpc_error(
            StatusCode::BAD_REQUEST,
            JsonRpcError::invalid_request(Some(format!(
                "Bad Request: Unsupported protocol version {:?}",
                value
            ))),
        ))
    }
}

fn rpc_error(status: StatusCode, error: JsonRpcError) -> Response {
    let body = JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, None));
    (status, Json(body)).into_response()
}

fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    response
}
