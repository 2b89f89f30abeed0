use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

// Error codes the transaction pool returns for rejected submissions.
pub const RPC_DUPLICATE_TRANSACTION: i32 = -100;
pub const RPC_MALFORMED_TRANSACTION: i32 = -101;
pub const RPC_REJECTED_TRANSACTION: i32 = -102;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Chain RPC error {code}: {message}")]
    ChainRpc { code: i32, message: String },
    #[error("Transaction already in pool")]
    Duplicate,
    #[error("Malformed transaction: {0}")]
    Malformed(String),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}
