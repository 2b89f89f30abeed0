use std::path::Path;

use anyhow::Result;
use libsql::{Connection, params};

use super::connection::new_connection;
use crate::types::{BlockHeight, ContractId, ContractObligation, Hash256};

#[derive(Clone)]
pub struct Writer {
    conn: Connection,
}

impl Writer {
    pub async fn new(path: &Path) -> Result<Self> {
        let conn = new_connection(path).await?;
        Ok(Self { conn })
    }

    pub async fn upsert_obligation(&self, obligation: &ContractObligation) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO obligations (id, contract, path, status, proof_height)
                 VALUES (?, ?, ?, ?, ?)",
                (
                    obligation.id.to_string(),
                    serde_json::to_string(&obligation.contract)?,
                    obligation.path.to_string_lossy().into_owned(),
                    obligation.status.to_string(),
                    obligation.proof_height,
                ),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_obligation(&self, id: &ContractId) -> Result<()> {
        self.conn
            .execute("DELETE FROM obligations WHERE id = ?", params![id.to_string()])
            .await?;
        Ok(())
    }

    pub async fn set_chain_state(&self, height: BlockHeight, block_id: &Hash256) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO chain_state (id, height, block_id) VALUES (0, ?, ?)",
                (height, block_id.to_string()),
            )
            .await?;
        Ok(())
    }
}
