//! RPC Method Implementations
//!
//! Each method corresponds to a JSON-RPC call the game front end makes.
//! Parameters are positional (`params: [..]`); a bare scalar counts as a
//! one-element list.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::constants::CHAIN_NAME;
use crate::error::LedgerError;
use crate::ledger::RewardLedger;
use crate::node::NodeHandle;

/// Default page size for `getblocks`
const DEFAULT_BLOCK_PAGE: usize = 20;

/// Default row count for `getleaderboard`
const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// JSON-RPC error codes
pub mod codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const NOT_FOUND: i32 = -5;
    pub const REJECTED: i32 = -6;
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }

    fn from_result<T: Serialize>(id: Value, result: Result<T, (i32, String)>) -> Self {
        match result.and_then(|value| {
            serde_json::to_value(value).map_err(|e| (codes::REJECTED, e.to_string()))
        }) {
            Ok(value) => Self::success(id, value),
            Err((code, message)) => Self::error(id, code, message),
        }
    }
}

/// RPC Handler State
pub struct RpcState {
    pub node: NodeHandle,
}

/// Process a JSON-RPC request and return a response
pub async fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    debug!(method = %request.method, "RPC request");
    let params = positional(request.params);
    let id = request.id;

    match request.method.as_str() {
        "gettelemetry" => JsonRpcResponse::from_result(id, Ok(state.node.telemetry())),
        "getchaininfo" => get_chain_info(state, id).await,
        "getblock" => get_block(state, id, &params).await,
        "getblocks" => get_blocks(state, id, &params).await,
        "getemissionspreview" => get_emissions_preview(state, id).await,
        "getparticipant" => get_participant(state, id, &params).await,
        "getleaderboard" => get_leaderboard(state, id, &params).await,
        "getrigtiers" => get_rig_tiers(state, id).await,
        "buyrig" => buy_rig(state, id, &params).await,
        "repairrig" => repair_rig(state, id, &params).await,
        "getsupply" => get_supply(state, id).await,
        _ => JsonRpcResponse::error(
            id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    }
}

/// Returns general chain information
async fn get_chain_info(state: &RpcState, id: Value) -> JsonRpcResponse {
    let info = state
        .node
        .with_producer(|producer, _| {
            let stats = producer.chain().get_stats();
            json!({
                "chain": CHAIN_NAME,
                "blocks": stats.height,
                "tip": stats.tip_hash.to_hex(),
                "difficulty": stats.difficulty,
                "avg_block_time": stats.avg_block_time,
                "buffered_blocks": stats.buffered_blocks,
                "emitted": producer.schedule().emitted_total(),
                "season_ended": producer.is_season_ended(),
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;
    JsonRpcResponse::success(id, info)
}

/// Returns one buffered block by height
/// Params: [height]
async fn get_block(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let height = match required_u64(params, 0, "height") {
        Ok(h) => h,
        Err(e) => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e),
    };

    let block = state
        .node
        .with_producer(|producer, _| producer.block_at(height).cloned())
        .await;

    JsonRpcResponse::from_result(
        id,
        block.ok_or_else(|| (codes::NOT_FOUND, format!("Block {} not found", height))),
    )
}

/// Returns a newest-first page of recent blocks
/// Params: [(optional) cursor, (optional) limit]
async fn get_blocks(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let (cursor, limit) = match (
        optional_u64(params, 0, "cursor"),
        optional_u64(params, 1, "limit"),
    ) {
        (Ok(cursor), Ok(limit)) => (cursor, limit.map_or(DEFAULT_BLOCK_PAGE, |l| l as usize)),
        (Err(e), _) | (_, Err(e)) => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e),
    };

    let page = state
        .node
        .with_producer(|producer, _| producer.recent_blocks(cursor, limit))
        .await;
    JsonRpcResponse::from_result(id, Ok(page))
}

async fn get_emissions_preview(state: &RpcState, id: Value) -> JsonRpcResponse {
    let preview = state
        .node
        .with_producer(|producer, _| producer.emissions_preview())
        .await;
    JsonRpcResponse::from_result(id, Ok(preview))
}

/// Params: [participant]
async fn get_participant(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let participant = match required_str(params, 0, "participant") {
        Ok(p) => p,
        Err(e) => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e),
    };

    let summary = state
        .node
        .with_producer(|producer, now| producer.ledger().summary(&participant, now))
        .await;
    JsonRpcResponse::from_result(id, summary.map_err(ledger_error))
}

/// Params: [(optional) limit]
async fn get_leaderboard(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let limit = match optional_u64(params, 0, "limit") {
        Ok(limit) => limit.map_or(DEFAULT_LEADERBOARD_SIZE, |l| l as usize),
        Err(e) => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e),
    };

    let board = state
        .node
        .with_producer(|producer, now| producer.ledger().leaderboard(limit, now))
        .await;
    JsonRpcResponse::from_result(id, Ok(board))
}

/// Catalog priced at the current reward
async fn get_rig_tiers(state: &RpcState, id: Value) -> JsonRpcResponse {
    let tiers = state
        .node
        .with_producer(|producer, _| {
            let reward = producer.current_reward();
            json!({
                "current_reward": reward,
                "tiers": producer.ledger().rig_tiers(reward),
            })
        })
        .await;
    JsonRpcResponse::success(id, tiers)
}

/// Buy a rig at the current price
/// Params: [participant, tier_id, (optional) idempotency_key]
async fn buy_rig(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let (participant, tier_id, key) = match (
        required_str(params, 0, "participant"),
        required_str(params, 1, "tier_id"),
        optional_str(params, 2, "idempotency_key"),
    ) {
        (Ok(p), Ok(t), Ok(k)) => (p, t, k),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e)
        }
    };

    let purchase = state
        .node
        .with_producer(|producer, now| {
            let reward = producer.current_reward();
            producer
                .ledger_mut()
                .buy_rig(&participant, &tier_id, reward, key, now)
        })
        .await;
    JsonRpcResponse::from_result(id, purchase.map_err(ledger_error))
}

/// Params: [participant, rig_id]
async fn repair_rig(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let (participant, rig_id) = match (
        required_str(params, 0, "participant"),
        required_str(params, 1, "rig_id"),
    ) {
        (Ok(p), Ok(r)) => (p, r),
        (Err(e), _) | (_, Err(e)) => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e),
    };

    let repair = state
        .node
        .with_producer(|producer, now| producer.ledger_mut().repair_rig(&participant, &rig_id, now))
        .await;
    JsonRpcResponse::from_result(id, repair.map_err(ledger_error))
}

async fn get_supply(state: &RpcState, id: Value) -> JsonRpcResponse {
    let supply = state
        .node
        .with_producer(|producer, _| producer.ledger().supply())
        .await;
    JsonRpcResponse::from_result(id, Ok(supply))
}

fn ledger_error(error: LedgerError) -> (i32, String) {
    let code = match error {
        LedgerError::UnknownParticipant(_)
        | LedgerError::UnknownTier(_)
        | LedgerError::UnknownRig(_) => codes::NOT_FOUND,
        LedgerError::InsufficientBalance { .. } | LedgerError::DuplicateRequest(_) => {
            codes::REJECTED
        }
    };
    (code, error.to_string())
}

fn positional(params: Option<Value>) -> Vec<Value> {
    match params {
        Some(Value::Array(values)) => values,
        Some(Value::Null) | None => Vec::new(),
        Some(value) => vec![value],
    }
}

fn required_u64(params: &[Value], index: usize, name: &str) -> Result<u64, String> {
    optional_u64(params, index, name)?.ok_or_else(|| format!("Invalid params: expected {}", name))
}

fn optional_u64(params: &[Value], index: usize, name: &str) -> Result<Option<u64>, String> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| format!("Invalid params: {} must be a non-negative integer", name)),
    }
}

fn required_str(params: &[Value], index: usize, name: &str) -> Result<String, String> {
    optional_str(params, index, name)?.ok_or_else(|| format!("Invalid params: expected {}", name))
}

fn optional_str(params: &[Value], index: usize, name: &str) -> Result<Option<String>, String> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
        Some(_) => Err(format!("Invalid params: {} must be a non-empty string", name)),
    }
}
