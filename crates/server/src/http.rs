//! Streamable HTTP transport
//!
//! One endpoint (default `/mcp`): `POST` carries a JSON-RPC message,
//! `DELETE` ends a session, `GET` is refused because this server never
//! opens a server-initiated stream.

use crate::mcp_server_core::McpServerCore;
use crate::session::SessionStore;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use shared::{
    error_codes, Implementation, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION,
    LATEST_PROTOCOL_VERSION,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Header carrying the session id
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Where and how to listen
#[derive(Debug, Clone, PartialEq)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            path: "/mcp".to_string(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    core: Arc<McpServerCore>,
    sessions: Arc<SessionStore>,
}

/// Build the axum router serving `core` at `path`
pub fn router(core: Arc<McpServerCore>, path: &str) -> Router {
    let state = AppState {
        core,
        sessions: Arc::new(SessionStore::new()),
    };

    Router::new()
        .route(path, post(handle_post).get(handle_get).delete(handle_delete))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(core: McpServerCore, options: ServeOptions) -> shared::Result<()> {
    let listener = TcpListener::bind((options.host.as_str(), options.port)).await?;
    info!(
        server = %core.info().name,
        tools = ?core.tool_names(),
        "MCP server listening on http://{}:{}{}",
        options.host,
        options.port,
        options.path
    );
    serve_on(listener, Arc::new(core), &options.path, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_on<F>(
    listener: TcpListener,
    core: Arc<McpServerCore>,
    path: &str,
    shutdown: F,
) -> shared::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(core, path);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down MCP server");
}

async fn handle_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::parse_error(e)),
    };

    // serde would otherwise accept a positional array as a request
    if !value.is_object() {
        let detail = if value.is_array() {
            "batch requests are not supported"
        } else {
            "message must be a JSON object"
        };
        return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::invalid_request(detail));
    }

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::invalid_request(e)),
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            request.id,
            JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
        );
    }

    if request.method == "initialize" && !request.is_notification() {
        return initialize(&state, request).await;
    }

    let Some(session_id) = session_id(&headers) else {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            request.id,
            JsonRpcError::invalid_request("missing Mcp-Session-Id header"),
        );
    };

    if !state.sessions.touch(&session_id).await {
        debug!(session = %session_id, "unknown session");
        return rpc_error(
            StatusCode::NOT_FOUND,
            request.id,
            JsonRpcError::new(error_codes::INVALID_REQUEST, "Session not found"),
        );
    }

    match state.core.handle(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn initialize(state: &AppState, request: JsonRpcRequest) -> Response {
    let client = request
        .params
        .as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| serde_json::from_value::<Implementation>(c.clone()).ok());

    let Some(response) = state.core.handle(request).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    if response.error.is_some() {
        return Json(response).into_response();
    }

    let version = response
        .result
        .as_ref()
        .and_then(|r| r.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
        .to_string();

    let session_id = state.sessions.create(client, version).await;
    info!(session = %session_id, "session created");

    let mut http_response = Json(response).into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        http_response.headers_mut().insert(SESSION_HEADER, value);
    }
    http_response
}

async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "missing Mcp-Session-Id header").into_response();
    };

    if state.sessions.remove(&session_id).await {
        info!(session = %session_id, "session terminated");
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn handle_get() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST, DELETE")]).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn rpc_error(status: StatusCode, id: Option<RequestId>, error: JsonRpcError) -> Response {
    (status, Json(JsonRpcResponse::failure(id, error))).into_response()
}
