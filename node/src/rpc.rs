//! # JSON-RPC Gateway
//!
//! JSON-RPC 2.0 over `POST /rpc`. Every vault operation is exposed, plus a
//! handful of devnet-only methods for minting funds and moving prices.
//! Parameters are named (a JSON object). Amounts are accepted as decimal
//! strings or JSON integers and always returned as strings.
//!
//! | Method                         | Params                              |
//! |--------------------------------|-------------------------------------|
//! | `custodia_deposit`             | `caller`, `asset`, `amount`         |
//! | `custodia_withdraw`            | `caller`, `asset`, `amount`         |
//! | `custodia_registerAsset`       | `caller`, `asset`, `feed`           |
//! | `custodia_setFeed`             | `caller`, `asset`, `feed`           |
//! | `custodia_getBalance`          | `caller`, `asset`                   |
//! | `custodia_getReserve`          | `asset`                             |
//! | `custodia_getReserveCounters`  | `asset`                             |
//! | `custodia_getTotalValuation`   | `caller`                            |
//! | `custodia_getCap`              | —                                   |
//! | `custodia_supportedAssets`     | —                                   |
//! | `custodia_previewValue`        | `asset`, `amount`                   |
//! | `custodia_events`              | `from`                              |
//! | `custodia_audit`               | —                                   |
//! | `custodia_version`             | —                                   |
//! | `custodia_faucet`              | `account`, `asset`, `amount`        |
//! | `custodia_approve`             | `owner`, `token`, `amount`          |
//! | `custodia_walletBalance`       | `account`, `asset`                  |
//! | `custodia_deployToken`         | `symbol`, `decimals`                |
//! | `custodia_deployFeed`          | `description`, `decimals`, `answer` |
//! | `custodia_updatePrice`         | `feed`, `answer`                    |
//!
//! `custodia_getBalance` answers for the calling account only. Reading
//! another account's vault balance is the REST inspection endpoint, which
//! is public on the devnet like every other read.
//!
//! ## Error codes
//!
//! Protocol errors use the standard range (`-32600` … `-32603`). Vault
//! errors use `-32010` onwards, one code per kind, with the structured
//! context (amounts, limits, addresses) in `data`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use custodia_contracts::{Receipt, VaultError};
use custodia_protocol::config::DEFAULT_FEED_DECIMALS;
use custodia_protocol::{Address, Amount, AssetId};

use crate::api::AppState;
use crate::devnet::DevnetError;

// ---------------------------------------------------------------------------
// Envelope Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    /// Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL: i32 = -32603;
    pub const DEVNET: i32 = -32050;

    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn err(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// JSON-RPC code for a vault error kind.
pub fn vault_error_code(err: &VaultError) -> i32 {
    match err {
        VaultError::ZeroAmount => -32010,
        VaultError::UnsupportedAsset(_) => -32011,
        VaultError::AlreadySupported(_) => -32012,
        VaultError::InvalidFeed(_) => -32013,
        VaultError::InvalidOrStalePrice { .. } => -32014,
        VaultError::BankCapExceeded { .. } => -32015,
        VaultError::WithdrawalLimitExceeded { .. } => -32016,
        VaultError::InsufficientFunds { .. } => -32017,
        VaultError::TransferFailed(_) => -32018,
        VaultError::InvalidCapValue => -32019,
        VaultError::Unauthorized { .. } => -32020,
        VaultError::ReentrantCall => -32021,
        VaultError::AssetUnavailable(_) => -32022,
        VaultError::FeedUnavailable(_) => -32023,
        VaultError::ArithmeticOverflow => -32024,
    }
}

/// Structured context for a vault error. Amounts are strings.
pub fn vault_error_data(err: &VaultError) -> Value {
    let mut data = match err {
        VaultError::UnsupportedAsset(asset)
        | VaultError::AlreadySupported(asset)
        | VaultError::TransferFailed(asset)
        | VaultError::InvalidOrStalePrice { asset } => json!({ "asset": asset }),
        VaultError::InvalidFeed(feed) | VaultError::FeedUnavailable(feed) => {
            json!({ "feed": feed })
        }
        VaultError::AssetUnavailable(token) => json!({ "token": token }),
        VaultError::BankCapExceeded { cap, projected } => json!({
            "cap": cap.to_string(),
            "projected": projected.to_string(),
        }),
        VaultError::WithdrawalLimitExceeded { limit, requested } => json!({
            "limit": limit.to_string(),
            "requested": requested.to_string(),
        }),
        VaultError::InsufficientFunds {
            available,
            requested,
        } => json!({
            "available": available.to_string(),
            "requested": requested.to_string(),
        }),
        VaultError::Unauthorized { caller } => json!({ "caller": caller }),
        VaultError::ZeroAmount
        | VaultError::InvalidCapValue
        | VaultError::ReentrantCall
        | VaultError::ArithmeticOverflow => json!({}),
    };
    data["kind"] = json!(err.kind());
    data
}

impl From<VaultError> for JsonRpcError {
    fn from(err: VaultError) -> Self {
        Self {
            code: vault_error_code(&err),
            message: err.to_string(),
            data: Some(vault_error_data(&err)),
        }
    }
}

impl From<DevnetError> for JsonRpcError {
    fn from(err: DevnetError) -> Self {
        match err {
            DevnetError::Vault(inner) => inner.into(),
            other => Self::new(Self::DEVNET, other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// An integer given either as a JSON number or as a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IntParam {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl IntParam {
    fn amount(&self) -> Result<Amount, JsonRpcError> {
        match self {
            IntParam::Unsigned(n) => Ok(u128::from(*n)),
            IntParam::Signed(_) => Err(JsonRpcError::invalid_params("amount must be non-negative")),
            IntParam::Text(s) => s
                .parse()
                .map_err(|_| JsonRpcError::invalid_params(format!("invalid amount: {s}"))),
        }
    }

    fn signed(&self) -> Result<i128, JsonRpcError> {
        match self {
            IntParam::Unsigned(n) => Ok(i128::from(*n)),
            IntParam::Signed(n) => Ok(i128::from(*n)),
            IntParam::Text(s) => s
                .parse()
                .map_err(|_| JsonRpcError::invalid_params(format!("invalid integer: {s}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransferParams {
    caller: Address,
    asset: AssetId,
    amount: IntParam,
}

#[derive(Debug, Deserialize)]
struct FeedParams {
    caller: Address,
    asset: AssetId,
    feed: Address,
}

#[derive(Debug, Deserialize)]
struct AccountAssetParams {
    account: Address,
    asset: AssetId,
}

#[derive(Debug, Deserialize)]
struct CallerAssetParams {
    caller: Address,
    asset: AssetId,
}

#[derive(Debug, Deserialize)]
struct AssetParams {
    asset: AssetId,
}

#[derive(Debug, Deserialize)]
struct CallerParams {
    caller: Address,
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    asset: AssetId,
    amount: IntParam,
}

#[derive(Debug, Deserialize)]
struct EventsParams {
    #[serde(default)]
    from: u64,
}

#[derive(Debug, Deserialize)]
struct FaucetParams {
    account: Address,
    asset: AssetId,
    amount: IntParam,
}

#[derive(Debug, Deserialize)]
struct ApproveParams {
    owner: Address,
    token: Address,
    amount: IntParam,
}

#[derive(Debug, Deserialize)]
struct DeployTokenParams {
    symbol: String,
    decimals: u8,
}

#[derive(Debug, Deserialize)]
struct DeployFeedParams {
    description: String,
    #[serde(default = "default_feed_decimals")]
    decimals: u8,
    answer: IntParam,
}

#[derive(Debug, Deserialize)]
struct UpdatePriceParams {
    feed: Address,
    answer: IntParam,
}

fn default_feed_decimals() -> u8 {
    DEFAULT_FEED_DECIMALS
}

fn parse<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let value = match params {
        None | Some(Value::Null) => json!({}),
        Some(v) => v,
    };
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))
}

fn receipt_json(receipt: &Receipt) -> Value {
    json!({
        "amount": receipt.amount.to_string(),
        "reference_value": receipt.reference_value.to_string(),
        "balance": receipt.balance.to_string(),
        "event_seq": receipt.event_seq,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Executes one request under the sequencer and publishes any events it
/// produced.
pub async fn dispatch(state: &AppState, req: JsonRpcRequest) -> JsonRpcResponse {
    if req.jsonrpc != "2.0" {
        return JsonRpcResponse::err(
            req.id,
            JsonRpcError::new(
                JsonRpcError::INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ),
        );
    }

    let mut sequencer = state.sequencer.lock().await;
    let outcome = {
        let _timer = state.metrics.operation_latency_seconds.start_timer();
        call(state, &req.method, req.params)
    };
    sequencer.publish(state);
    drop(sequencer);

    match outcome {
        Ok(result) => JsonRpcResponse::ok(req.id, result),
        Err(error) => {
            tracing::debug!(method = %req.method, code = error.code, message = %error.message, "rpc error");
            JsonRpcResponse::err(req.id, error)
        }
    }
}

fn call(state: &AppState, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let devnet = &state.devnet;
    let vault = devnet.vault();

    match method {
        "custodia_deposit" => {
            let p: TransferParams = parse(params)?;
            let amount = p.amount.amount()?;
            let receipt = vault
                .deposit(&p.caller, p.asset, amount)
                .map_err(|e| rejected(state, e))?;
            state.metrics.deposits_total.inc();
            Ok(receipt_json(&receipt))
        }
        "custodia_withdraw" => {
            let p: TransferParams = parse(params)?;
            let amount = p.amount.amount()?;
            let receipt = vault
                .withdraw(&p.caller, p.asset, amount)
                .map_err(|e| rejected(state, e))?;
            state.metrics.withdrawals_total.inc();
            Ok(receipt_json(&receipt))
        }
        "custodia_registerAsset" => {
            let p: FeedParams = parse(params)?;
            let config = vault
                .register_asset(&p.caller, p.asset, p.feed)
                .map_err(|e| rejected(state, e))?;
            state
                .metrics
                .registered_assets
                .set(vault.supported_assets().len() as i64);
            Ok(json!({ "asset": p.asset, "config": config }))
        }
        "custodia_setFeed" => {
            let p: FeedParams = parse(params)?;
            let previous = vault
                .set_feed(&p.caller, p.asset, p.feed)
                .map_err(|e| rejected(state, e))?;
            Ok(json!({ "asset": p.asset, "previous": previous, "feed": p.feed }))
        }
        "custodia_getBalance" => {
            let p: CallerAssetParams = parse(params)?;
            let balance = vault.balance_of(&p.caller, &p.asset)?;
            Ok(json!(balance.to_string()))
        }
        "custodia_getReserve" => {
            let p: AssetParams = parse(params)?;
            Ok(json!(vault.reserve(&p.asset)?.to_string()))
        }
        "custodia_getReserveCounters" => {
            let p: AssetParams = parse(params)?;
            Ok(json!(vault.reserve_counters(&p.asset)?))
        }
        "custodia_getTotalValuation" => {
            let p: CallerParams = parse(params)?;
            let total = vault
                .total_valuation(&p.caller)
                .map_err(|e| rejected(state, e))?;
            Ok(json!(total.to_string()))
        }
        "custodia_getCap" => Ok(json!({
            "bank_cap": vault.bank_cap().to_string(),
            "withdrawal_limit": vault.withdrawal_limit().to_string(),
        })),
        "custodia_supportedAssets" => Ok(json!(vault.supported_assets())),
        "custodia_previewValue" => {
            let p: PreviewParams = parse(params)?;
            let value = vault.preview_reference_value(&p.asset, p.amount.amount()?)?;
            Ok(json!(value.to_string()))
        }
        "custodia_events" => {
            let p: EventsParams = parse(params)?;
            Ok(json!(vault.events_since(p.from)))
        }
        "custodia_audit" => Ok(json!(vault.audit())),
        "custodia_version" => Ok(json!(state.version)),

        // -- devnet ---------------------------------------------------------
        "custodia_faucet" => {
            let p: FaucetParams = parse(params)?;
            let balance = devnet.faucet(&p.account, &p.asset, p.amount.amount()?)?;
            Ok(json!(balance.to_string()))
        }
        "custodia_approve" => {
            let p: ApproveParams = parse(params)?;
            devnet.approve(&p.owner, &p.token, p.amount.amount()?)?;
            Ok(json!(true))
        }
        "custodia_walletBalance" => {
            let p: AccountAssetParams = parse(params)?;
            Ok(json!(devnet.wallet_balance(&p.account, &p.asset)?.to_string()))
        }
        "custodia_deployToken" => {
            let p: DeployTokenParams = parse(params)?;
            Ok(json!(devnet.deploy_token(&p.symbol, p.decimals)))
        }
        "custodia_deployFeed" => {
            let p: DeployFeedParams = parse(params)?;
            Ok(json!(devnet.deploy_feed(
                &p.description,
                p.decimals,
                p.answer.signed()?
            )))
        }
        "custodia_updatePrice" => {
            let p: UpdatePriceParams = parse(params)?;
            let round = devnet.update_price(&p.feed, p.answer.signed()?)?;
            Ok(json!({ "feed": p.feed, "round_id": round }))
        }
        other => Err(JsonRpcError::new(
            JsonRpcError::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}

fn rejected(state: &AppState, err: VaultError) -> JsonRpcError {
    state.metrics.record_rejection(err.kind());
    tracing::info!(kind = err.kind(), error = %err, "vault operation rejected");
    err.into()
}
