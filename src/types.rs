use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub type BlockHeight = u64;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(String);

/// 32-byte identifier, displayed and serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() != 32 {
            return Err(ParseError(format!("expected 32 bytes, got {}", bytes.len())));
        }
        let mut array = [0u8; 32];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl FromStr for Hash256 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseError(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Identifier of an accepted file contract.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContractId(pub Hash256);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", self.0)
    }
}

impl FromStr for ContractId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: u64,
    pub address: Hash256,
}

/// Blockchain-recorded storage agreement. Immutable once accepted; the payout
/// tax is already deducted by the external formation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContract {
    pub file_size: u64,
    pub file_merkle_root: Hash256,
    pub start_height: BlockHeight,
    pub expiration_height: BlockHeight,
    pub payout: u64,
    pub valid_proof_outputs: Vec<Output>,
    pub missed_proof_outputs: Vec<Output>,
}

impl FileContract {
    /// Deterministic identifier: SHA-256 of the contract's JSON encoding.
    pub fn id(&self) -> ContractId {
        let encoded = serde_json::to_vec(self).expect("file contract encoding is infallible");
        let digest = Sha256::digest(&encoded);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        ContractId(Hash256(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    ProofDue,
    ProofSubmitted,
    Settled,
    Forfeited,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::ProofDue => "proof_due",
            Status::ProofSubmitted => "proof_submitted",
            Status::Settled => "settled",
            Status::Forfeited => "forfeited",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "proof_due" => Ok(Status::ProofDue),
            "proof_submitted" => Ok(Status::ProofSubmitted),
            "settled" => Ok(Status::Settled),
            "forfeited" => Ok(Status::Forfeited),
            other => Err(ParseError(format!("unknown status: {}", other))),
        }
    }
}

/// Host-side bookkeeping record for one accepted contract. `proof_height` is
/// the height at which the next proof action is due.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractObligation {
    pub id: ContractId,
    pub contract: FileContract,
    pub path: PathBuf,
    pub status: Status,
    pub proof_height: BlockHeight,
}

/// Settlement transaction demonstrating possession of one pseudorandomly
/// chosen segment of the stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProof {
    pub contract_id: ContractId,
    pub segment_index: u64,
    #[serde(with = "hex_bytes")]
    pub segment: Vec<u8>,
    pub hash_path: Vec<Hash256>,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(de::Error::custom)
    }
}
