use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::{BlockHeight, ContractObligation, FileContract, Hash256};

#[derive(Debug, Deserialize)]
pub struct ObligationRow {
    pub id: String,
    pub contract: String,
    pub path: String,
    pub status: String,
    pub proof_height: u64,
}

impl ObligationRow {
    pub fn into_obligation(self) -> Result<ContractObligation> {
        let contract: FileContract =
            serde_json::from_str(&self.contract).context("Invalid contract encoding")?;
        Ok(ContractObligation {
            id: self.id.parse().context("Invalid contract id")?,
            contract,
            path: PathBuf::from(self.path),
            status: self.status.parse().context("Invalid obligation status")?,
            proof_height: self.proof_height,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChainStateRow {
    pub height: u64,
    pub block_id: String,
}

impl ChainStateRow {
    pub fn into_state(self) -> Result<(BlockHeight, Hash256)> {
        Ok((self.height, self.block_id.parse().context("Invalid block id")?))
    }
}
