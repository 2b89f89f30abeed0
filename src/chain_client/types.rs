use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BlockHeight, ContractId, Hash256};

#[derive(Debug, Serialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Response {
    pub result: Option<Value>,
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorDetail {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub height: BlockHeight,
    pub block_id: Hash256,
    /// Confirmations before a settlement payout becomes spendable; consumed
    /// for operator reporting only, never enforced here.
    pub maturity_delay: u64,
}

/// What the engine needs from one canonical block: its identifier (the
/// segment-selection seed) and the contract ids whose storage proofs it
/// confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub height: BlockHeight,
    pub id: Hash256,
    pub confirmed_proofs: Vec<ContractId>,
}
