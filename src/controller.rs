use std::{path::PathBuf, sync::Arc};

use tokio::{select, sync::mpsc::Receiver, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    chain_client::{ChainRpc, Error as RpcError, types::BlockSummary},
    database::Writer,
    merkle,
    storage::{StorageBackend, StorageError},
    store::ObligationStore,
    types::{BlockHeight, ContractObligation, Hash256, Status, StorageProof},
};

enum ProofFailure {
    /// Stored data gone; terminal for the obligation.
    Missing(PathBuf),
    /// Stored data no longer matches the contract root; terminal.
    Corrupt { expected: Hash256, computed: Hash256 },
    /// Disk hiccup; reattempted at the next height, bounded by expiration.
    Transient(StorageError),
}

/// Drives every obligation through its lifecycle as the chain advances:
/// settles confirmed proofs, generates and submits proofs that fall due,
/// and forfeits obligations that expire without one.
pub struct Controller<C: ChainRpc> {
    store: Arc<ObligationStore>,
    backend: Arc<StorageBackend>,
    chain: C,
    writer: Writer,
    proof_interval: u64,
    prune_forfeited: bool,
}

impl<C: ChainRpc> Controller<C> {
    pub fn new(
        store: Arc<ObligationStore>,
        backend: Arc<StorageBackend>,
        chain: C,
        writer: Writer,
        proof_interval: u64,
        prune_forfeited: bool,
    ) -> Self {
        Self {
            store,
            backend,
            chain,
            writer,
            proof_interval,
            prune_forfeited,
        }
    }

    pub fn run(self, cancel_token: CancellationToken, mut rx: Receiver<BlockSummary>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut option_last_height = None;
            loop {
                select! {
                    _ = cancel_token.cancelled() => {
                        info!("Controller cancelled");
                        break;
                    }
                    option_block = rx.recv() => {
                        match option_block {
                            Some(block) => {
                                if let Some(last_height) = option_last_height {
                                    if block.height != last_height + 1 {
                                        error!("Height order exception: {} after {}", block.height, last_height);
                                        cancel_token.cancel();
                                        continue;
                                    }
                                }
                                option_last_height = Some(block.height);
                                self.process_block(&block).await;
                            },
                            None => {
                                info!("Received None event, exiting");
                                break;
                            },
                        }
                    }
                }
            }

            rx.close();
            while rx.recv().await.is_some() {}

            info!("Exited");
        })
    }

    async fn process_block(&self, block: &BlockSummary) {
        debug!("Processing block {} at height {}", block.id, block.height);
        self.settle_confirmed(block).await;
        self.process_due(block).await;
        self.sweep_expired(block.height).await;
        if let Err(e) = self.writer.set_chain_state(block.height, &block.id).await {
            error!("Failed to persist chain state at height {}: {}", block.height, e);
        }
    }

    /// Confirmed proofs either reschedule the obligation to its next periodic
    /// proof height or, past the last one, settle and retire it.
    async fn settle_confirmed(&self, block: &BlockSummary) {
        for id in &block.confirmed_proofs {
            let Some(obligation) = self.store.get(*id) else {
                continue;
            };
            let next_height = obligation.proof_height + self.proof_interval;
            if next_height < obligation.contract.expiration_height {
                match self.store.reschedule(obligation.id, next_height) {
                    Ok(()) => {
                        info!(
                            "Proof confirmed for contract {}, next proof due at height {}",
                            obligation.id, next_height
                        );
                        let mut updated = obligation;
                        updated.proof_height = next_height;
                        updated.status = Status::Pending;
                        if let Err(e) = self.writer.upsert_obligation(&updated).await {
                            error!("Failed to persist obligation {}: {}", updated.id, e);
                        }
                    }
                    Err(e) => warn!("Could not reschedule contract {}: {}", obligation.id, e),
                }
            } else {
                self.settle(&obligation, block.height).await;
            }
        }
    }

    async fn settle(&self, obligation: &ContractObligation, height: BlockHeight) {
        if self.store.retire(obligation.id).is_none() {
            return;
        }
        info!(
            "Contract {} settled at height {}, payout {} released",
            obligation.id, height, obligation.contract.payout
        );
        if let Err(e) = self.writer.delete_obligation(&obligation.id).await {
            error!("Failed to remove obligation {}: {}", obligation.id, e);
        }
        if let Err(e) = self.backend.delete(&obligation.path) {
            warn!("Failed to prune data for contract {}: {}", obligation.id, e);
        }
    }

    async fn process_due(&self, block: &BlockSummary) {
        for obligation in self.store.due_at(block.height) {
            if obligation.contract.expiration_height <= block.height {
                continue; // expiration sweep handles it
            }
            match self.build_proof(&obligation, &block.id) {
                Ok(proof) => self.submit_proof(&obligation, proof).await,
                Err(ProofFailure::Missing(path)) => {
                    self.forfeit(
                        &obligation,
                        block.height,
                        &format!("stored data missing at {}", path.display()),
                    )
                    .await;
                }
                Err(ProofFailure::Corrupt { expected, computed }) => {
                    self.forfeit(
                        &obligation,
                        block.height,
                        &format!("stored data corrupt: root {} != contract root {}", computed, expected),
                    )
                    .await;
                }
                Err(ProofFailure::Transient(e)) => {
                    warn!(
                        "Deferring proof for contract {} to next height: {}",
                        obligation.id, e
                    );
                }
            }
        }
    }

    // Proof generation happens on a snapshot, outside the store lock. The
    // file handle is scoped to this call and dropped on every exit path.
    fn build_proof(
        &self,
        obligation: &ContractObligation,
        block_id: &Hash256,
    ) -> Result<StorageProof, ProofFailure> {
        let count = merkle::segment_count(obligation.contract.file_size);
        let segment_index = merkle::proof_segment_index(block_id, &obligation.id, count);
        let mut file = match self.backend.open(&obligation.path) {
            Ok(file) => file,
            Err(StorageError::NotFound(path)) => return Err(ProofFailure::Missing(path)),
            Err(e) => return Err(ProofFailure::Transient(e)),
        };
        let proof = merkle::build_proof(&mut file, obligation.contract.file_size, segment_index)
            .map_err(|e| ProofFailure::Transient(e.into()))?;
        if proof.root != obligation.contract.file_merkle_root {
            return Err(ProofFailure::Corrupt {
                expected: obligation.contract.file_merkle_root,
                computed: proof.root,
            });
        }
        Ok(StorageProof {
            contract_id: obligation.id,
            segment_index,
            segment: proof.segment,
            hash_path: proof.hash_path,
        })
    }

    async fn submit_proof(&self, obligation: &ContractObligation, proof: StorageProof) {
        match self.chain.submit_storage_proof(&proof).await {
            Ok(()) => {
                info!(
                    "Submitted storage proof for contract {} (segment {})",
                    obligation.id, proof.segment_index
                );
                self.mark(obligation, Status::ProofSubmitted).await;
            }
            Err(RpcError::Duplicate) => {
                debug!("Storage proof for contract {} already pending in pool", obligation.id);
                self.mark(obligation, Status::ProofSubmitted).await;
            }
            Err(e) => {
                warn!(
                    "Storage proof submission failed for contract {}, retrying at next height: {}",
                    obligation.id, e
                );
                self.mark(obligation, Status::ProofDue).await;
            }
        }
    }

    async fn mark(&self, obligation: &ContractObligation, status: Status) {
        if let Err(e) = self.store.set_status(obligation.id, status) {
            warn!("Could not update contract {}: {}", obligation.id, e);
            return;
        }
        let mut updated = obligation.clone();
        updated.status = status;
        if let Err(e) = self.writer.upsert_obligation(&updated).await {
            error!("Failed to persist obligation {}: {}", updated.id, e);
        }
    }

    /// Expiration retires the obligation regardless of in-flight submissions;
    /// an unconfirmed proof past expiration can no longer pay out.
    async fn sweep_expired(&self, height: BlockHeight) {
        for obligation in self.store.expired_at(height) {
            self.forfeit(
                &obligation,
                height,
                "expiration height reached without a confirmed proof",
            )
            .await;
        }
    }

    async fn forfeit(&self, obligation: &ContractObligation, height: BlockHeight, reason: &str) {
        if self.store.retire(obligation.id).is_none() {
            return;
        }
        error!("Contract {} forfeited at height {}: {}", obligation.id, height, reason);
        if let Err(e) = self.writer.delete_obligation(&obligation.id).await {
            error!("Failed to remove obligation {}: {}", obligation.id, e);
        }
        if self.prune_forfeited {
            if let Err(e) = self.backend.delete(&obligation.path) {
                warn!("Failed to prune data for contract {}: {}", obligation.id, e);
            }
        }
    }
}
