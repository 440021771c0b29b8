//! # REST + WebSocket API
//!
//! The axum router in front of the vault. All handlers share [`AppState`]
//! through axum's `State` extractor, and every handler that touches the
//! vault first takes the sequencer lock, so the vault sees one request at a
//! time.
//!
//! ## Endpoints
//!
//! | Method | Path                                 | Description                   |
//! |--------|--------------------------------------|-------------------------------|
//! | GET    | `/health`                            | Liveness probe                |
//! | GET    | `/status`                            | Node and vault summary        |
//! | GET    | `/cap`                               | Bank cap and withdrawal limit |
//! | GET    | `/assets`                            | Supported assets              |
//! | GET    | `/accounts/:address/balances/:asset` | Vault balance                 |
//! | GET    | `/reserves/:asset`                   | Reserve and counters          |
//! | POST   | `/rpc`                               | JSON-RPC 2.0 gateway          |
//! | GET    | `/ws`                                | Live vault events             |
//!
//! Reads are unauthenticated. On the devnet any account's vault balance can
//! be inspected through `/accounts/:address/balances/:asset`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use custodia_contracts::{AssetConfig, EventRecord, ReserveCounters, VaultError};
use custodia_protocol::types::amount_str;
use custodia_protocol::{Address, Amount, AssetId};

use crate::devnet::Devnet;
use crate::metrics::SharedMetrics;
use crate::rpc::{self, JsonRpcRequest};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Serializes access to the vault and forwards new events to subscribers.
#[derive(Debug, Default)]
pub struct Sequencer {
    next_event: u64,
}

impl Sequencer {
    /// Broadcasts every event committed since the last call.
    pub fn publish(&mut self, state: &AppState) {
        for record in state.devnet.vault().events_since(self.next_event) {
            self.next_event = record.seq + 1;
            state.metrics.events_published_total.inc();
            // No subscribers is not an error.
            let _ = state.event_tx.send(record);
        }
    }
}

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Reported version string.
    pub version: String,
    /// Network label, always "devnet" for now.
    pub network: String,
    pub devnet: Arc<Devnet>,
    pub sequencer: Arc<Mutex<Sequencer>>,
    /// Live vault events for WebSocket subscribers.
    pub event_tx: broadcast::Sender<EventRecord>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub network: String,
    pub vault: Address,
    pub owner: Address,
    #[serde(with = "amount_str")]
    pub bank_cap: u128,
    #[serde(with = "amount_str")]
    pub withdrawal_limit: u128,
    pub supported_assets: usize,
    pub event_count: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /cap`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CapResponse {
    #[serde(with = "amount_str")]
    pub bank_cap: u128,
    #[serde(with = "amount_str")]
    pub withdrawal_limit: u128,
    /// Fixed-point digits of both values.
    pub reference_decimals: u8,
}

/// One entry of `GET /assets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetResponse {
    pub asset: AssetId,
    pub decimals: u8,
    pub feed: Address,
}

/// Response payload for `GET /accounts/:address/balances/:asset`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub asset: AssetId,
    #[serde(with = "amount_str")]
    pub balance: Amount,
}

/// Response payload for `GET /reserves/:asset`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub asset: AssetId,
    #[serde(with = "amount_str")]
    pub reserve: Amount,
    pub counters: ReserveCounters,
}

/// Error body returned by REST endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>, kind: Option<&str>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            kind: kind.map(str::to_string),
        }),
    )
        .into_response()
}

fn vault_error_response(err: &VaultError) -> Response {
    let status = match err {
        VaultError::UnsupportedAsset(_) => StatusCode::NOT_FOUND,
        VaultError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        VaultError::InvalidOrStalePrice { .. } | VaultError::FeedUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, err.to_string(), Some(err.kind()))
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/cap", get(cap_handler))
        .route("/assets", get(assets_handler))
        .route("/accounts/:address/balances/:asset", get(balance_handler))
        .route("/reserves/:asset", get(reserve_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let _seq = state.sequencer.lock().await;
    let vault = state.devnet.vault();
    Json(StatusResponse {
        version: state.version.clone(),
        network: state.network.clone(),
        vault: vault.address(),
        owner: vault.owner(),
        bank_cap: vault.bank_cap(),
        withdrawal_limit: vault.withdrawal_limit(),
        supported_assets: vault.supported_assets().len(),
        event_count: vault.event_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /cap`
async fn cap_handler(State(state): State<AppState>) -> impl IntoResponse {
    let vault = state.devnet.vault();
    Json(CapResponse {
        bank_cap: vault.bank_cap(),
        withdrawal_limit: vault.withdrawal_limit(),
        reference_decimals: custodia_protocol::config::REFERENCE_DECIMALS,
    })
}

/// `GET /assets`
async fn assets_handler(State(state): State<AppState>) -> impl IntoResponse {
    let _seq = state.sequencer.lock().await;
    let vault = state.devnet.vault();
    let assets: Vec<AssetResponse> = vault
        .supported_assets()
        .into_iter()
        .filter_map(|asset| {
            vault
                .asset_config(&asset)
                .ok()
                .map(|AssetConfig { decimals, feed, .. }| AssetResponse {
                    asset,
                    decimals,
                    feed,
                })
        })
        .collect();
    Json(assets)
}

/// `GET /accounts/:address/balances/:asset`
async fn balance_handler(
    Path((address, asset)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let account: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("bad address: {e}"), None),
    };
    let asset: AssetId = match asset.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("bad asset: {e}"), None),
    };

    let _seq = state.sequencer.lock().await;
    match state.devnet.vault().balance_of(&account, &asset) {
        Ok(balance) => Json(BalanceResponse {
            account,
            asset,
            balance,
        })
        .into_response(),
        Err(e) => vault_error_response(&e),
    }
}

/// `GET /reserves/:asset`
async fn reserve_handler(Path(asset): Path<String>, State(state): State<AppState>) -> Response {
    let asset: AssetId = match asset.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("bad asset: {e}"), None),
    };

    let _seq = state.sequencer.lock().await;
    let vault = state.devnet.vault();
    let result = vault
        .reserve(&asset)
        .and_then(|reserve| Ok((reserve, vault.reserve_counters(&asset)?)));
    match result {
        Ok((reserve, counters)) => Json(ReserveResponse {
            asset,
            reserve,
            counters,
        })
        .into_response(),
        Err(e) => vault_error_response(&e),
    }
}

/// `POST /rpc`
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    Json(rpc::dispatch(&state, req).await)
}

/// `GET /ws`: pushes every committed vault event as JSON. Client messages
/// are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(record) => {
                        let payload = match serde_json::to_string(&record) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
