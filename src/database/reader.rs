use std::path::Path;

use anyhow::{Context, Result};
use deadpool::managed::{Object, Pool};
use libsql::{de::from_row, params};

use super::{
    pool::{Manager, new_pool},
    types::{ChainStateRow, ObligationRow},
};
use crate::types::{BlockHeight, ContractId, ContractObligation, Hash256};

#[derive(Clone)]
pub struct Reader {
    pool: Pool<Manager>,
}

impl Reader {
    pub async fn new(path: &Path) -> Result<Self> {
        let pool = new_pool(path).await?;
        Ok(Self { pool })
    }

    async fn get_connection(&self) -> Result<Object<Manager>> {
        self.pool
            .get()
            .await
            .context("Failed to get connection for database reader pool")
    }

    pub async fn get_obligations(&self) -> Result<Vec<ContractObligation>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, contract, path, status, proof_height FROM obligations",
                params![],
            )
            .await?;
        let mut obligations = vec![];
        while let Some(row) = rows.next().await? {
            obligations.push(from_row::<ObligationRow>(&row)?.into_obligation()?);
        }
        Ok(obligations)
    }

    pub async fn get_obligation(&self, id: &ContractId) -> Result<Option<ContractObligation>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, contract, path, status, proof_height FROM obligations WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        Ok(match rows.next().await? {
            Some(row) => Some(from_row::<ObligationRow>(&row)?.into_obligation()?),
            None => None,
        })
    }

    pub async fn get_chain_state(&self) -> Result<Option<(BlockHeight, Hash256)>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query("SELECT height, block_id FROM chain_state WHERE id = 0", params![])
            .await?;
        Ok(match rows.next().await? {
            Some(row) => Some(from_row::<ChainStateRow>(&row)?.into_state()?),
            None => None,
        })
    }
}
