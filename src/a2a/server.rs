//! A2A HTTP server powered by axum.
//!
//! Serves:
//! - `GET  /.well-known/agent.json`       Agent Card discovery
//! - `GET  /.well-known/agent-card.json`  same card, newer well-known path
//! - `POST /a2a/v1`                       JSON-RPC 2.0 endpoint (SSE for `message/stream`)
//! - `GET  /a2a/health`                   Health check

use crate::a2a::agent_card::{self, CardSettings};
use crate::a2a::error::A2aError;
use crate::a2a::handler::{self, TaskManager};
use crate::a2a::types::*;
use crate::blueprints::Blueprint;
use crate::config::Config;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Shared state for the A2A server.
#[derive(Clone)]
pub struct A2aState {
    pub manager: TaskManager,
    pub card: Arc<AgentCard>,
    pub blueprint: Blueprint,
}

impl A2aState {
    /// Card and executor for `blueprint`. Fails on an invalid card.
    pub fn new(blueprint: Blueprint, config: &Config, port: u16) -> anyhow::Result<Self> {
        let settings =
            CardSettings::new(&config.server, &config.agent, port).with_tools(&config.tools);
        let card = agent_card::build_agent_card(blueprint, &settings);
        agent_card::validate_card(&card)?;
        let executor = blueprint.build_executor(config)?;
        Ok(Self {
            manager: TaskManager::new(executor),
            card: Arc::new(card),
            blueprint,
        })
    }
}

/// Build the axum router for the A2A server.
pub fn build_router(state: A2aState) -> Router {
    Router::new()
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/.well-known/agent-card.json", get(get_agent_card))
        .route("/a2a/v1", post(handle_jsonrpc))
        .route("/a2a/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server for `blueprint` and run until ctrl-c.
pub async fn start_server(blueprint: Blueprint, config: &Config) -> anyhow::Result<()> {
    let port = config.server.port.unwrap_or_else(|| blueprint.default_port());
    let state = A2aState::new(blueprint, config, port)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        "Starting {} ({} blueprint) on http://{}",
        state.card.name,
        blueprint,
        addr
    );
    tracing::info!("   Agent Card: http://{}/.well-known/agent.json", addr);
    tracing::info!("   JSON-RPC:   http://{}/a2a/v1", addr);
    if let Some(url) = state.card.jsonrpc_url() {
        tracing::info!("   Advertised: {}", url);
    }
    if blueprint == Blueprint::Orchestrator {
        for agent in &config.orchestrator.sub_agents {
            tracing::info!("   Sub-agent {}: {}", agent.name, agent.url);
        }
    }

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: A2aState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("A2A server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// GET /.well-known/agent.json
async fn get_agent_card(State(state): State<A2aState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// POST /a2a/v1
async fn handle_jsonrpc(State(state): State<A2aState>, body: Bytes) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                serde_json::Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ))
            .into_response();
        }
    };
    let id = value.get("id").cloned().unwrap_or(serde_json::Value::Null);
    let req: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))
            .into_response();
        }
    };

    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::error(
            req.id,
            error_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version, expected 2.0",
        ))
        .into_response();
    }

    if req.method == "message/stream" {
        return stream_message(req, &state.manager).await;
    }

    Json(handler::dispatch(req, &state.manager).await).into_response()
}

/// `message/stream` as server-sent events, one JSON-RPC envelope per frame.
async fn stream_message(req: JsonRpcRequest, manager: &TaskManager) -> Response {
    let params: SendMessageParams = match serde_json::from_value(req.params) {
        Ok(p) => p,
        Err(e) => return Json(A2aError::from(e).into_response(req.id)).into_response(),
    };
    let rx = match manager.stream_message(params).await {
        Ok(rx) => rx,
        Err(e) => return Json(e.into_response(req.id)).into_response(),
    };

    let id = req.id;
    let stream = futures::stream::unfold(rx, move |mut rx| {
        let id = id.clone();
        async move {
            let frame = rx.recv().await?;
            let result = serde_json::to_value(&frame).unwrap_or(serde_json::Value::Null);
            let event = Event::default().json_data(JsonRpcResponse::success(id, result));
            Some((event, rx))
        }
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// GET /a2a/health
async fn health_check(State(state): State<A2aState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "protocol": "A2A",
        "protocol_version": "1.0",
        "blueprint": state.blueprint.as_str(),
        "agent": state.card.name,
    }))
}
