use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use tempfile::TempDir;

use crate::{
    chain_client::{
        ChainRpc, Error,
        types::{BlockSummary, ChainInfo},
    },
    database::{Reader, Writer},
    merkle,
    storage::StorageBackend,
    types::{BlockHeight, ContractId, FileContract, Hash256, Output, StorageProof},
};

pub fn new_mock_hash(i: u32) -> Hash256 {
    let mut bytes = [0u8; 32];
    let i_bytes = i.to_le_bytes();
    for chunk in bytes.chunks_mut(4) {
        chunk.copy_from_slice(&i_bytes[..chunk.len()]);
    }
    Hash256(bytes)
}

pub fn new_mock_contract_id(i: u32) -> ContractId {
    ContractId(new_mock_hash(i))
}

/// File contract committing to `data` with a proof window of
/// `[start, expiration)`.
pub fn new_test_contract(data: &[u8], start: BlockHeight, expiration: BlockHeight) -> FileContract {
    let root = merkle::reader_root(&mut &data[..], data.len() as u64)
        .expect("in-memory read cannot fail");
    FileContract {
        file_size: data.len() as u64,
        file_merkle_root: root,
        start_height: start,
        expiration_height: expiration,
        payout: 1_000,
        valid_proof_outputs: vec![Output {
            value: 970,
            address: new_mock_hash(0xAA),
        }],
        missed_proof_outputs: vec![Output {
            value: 970,
            address: Hash256::default(),
        }],
    }
}

pub async fn new_test_db() -> Result<(Reader, Writer, TempDir)> {
    let temp_dir = TempDir::new()?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)?
        .as_nanos()
        .to_string();
    let db_name = format!("test_db_{}.db", timestamp);
    let db_path = temp_dir.path().join(db_name);
    let writer = Writer::new(&db_path).await?;
    let reader = Reader::new(&db_path).await?;
    Ok((reader, writer, temp_dir))
}

pub fn new_test_backend(capacity: u64) -> Result<(Arc<StorageBackend>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let backend = StorageBackend::new(temp_dir.path().join("data"), capacity)?;
    Ok((Arc::new(backend), temp_dir))
}

#[derive(Default)]
struct MockChainState {
    height: BlockHeight,
    block_id: Hash256,
    blocks: HashMap<BlockHeight, BlockSummary>,
    submitted: Vec<StorageProof>,
    submit_errors: VecDeque<Error>,
}

/// In-memory stand-in for the consensus daemon and its transaction pool.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<MockChainState>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockChainState> {
        self.state.lock().expect("mock chain lock poisoned")
    }

    /// Appends a block and advances the tip to it.
    pub fn add_block(&self, block: BlockSummary) {
        let mut state = self.lock();
        state.height = block.height;
        state.block_id = block.id;
        state.blocks.insert(block.height, block);
    }

    pub fn submitted(&self) -> Vec<StorageProof> {
        self.lock().submitted.clone()
    }

    /// Queues an error for the next submission attempt.
    pub fn push_submit_error(&self, error: Error) {
        self.lock().submit_errors.push_back(error);
    }
}

impl ChainRpc for MockChain {
    async fn get_chain_info(&self) -> Result<ChainInfo, Error> {
        let state = self.lock();
        Ok(ChainInfo {
            height: state.height,
            block_id: state.block_id,
            maturity_delay: 6,
        })
    }

    async fn get_block(&self, height: BlockHeight) -> Result<BlockSummary, Error> {
        self.lock()
            .blocks
            .get(&height)
            .cloned()
            .ok_or_else(|| Error::Unexpected(format!("no block at height {}", height)))
    }

    async fn submit_storage_proof(&self, proof: &StorageProof) -> Result<(), Error> {
        let mut state = self.lock();
        if let Some(error) = state.submit_errors.pop_front() {
            return Err(error);
        }
        state.submitted.push(proof.clone());
        Ok(())
    }
}
