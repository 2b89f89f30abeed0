use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
    sync::Arc,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    database::{Reader, Writer},
    merkle,
    storage::{StorageBackend, StorageError},
    store::ObligationStore,
    types::{ContractId, ContractObligation, FileContract, Hash256, Status},
};

#[derive(Debug, Error)]
pub enum FormationError {
    #[error("insufficient space for {0} bytes")]
    InsufficientSpace(u64),
    #[error("data does not match contract root: expected {expected}, computed {computed}")]
    MerkleMismatch { expected: Hash256, computed: Hash256 },
    #[error("data stream held {written} bytes, contract promises {expected}")]
    SizeMismatch { expected: u64, written: u64 },
    #[error("duplicate contract id: {0}")]
    DuplicateId(ContractId),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to persist obligation: {0}")]
    Persistence(String),
}

impl From<StorageError> for FormationError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InsufficientSpace { requested, .. } => {
                FormationError::InsufficientSpace(requested)
            }
            StorageError::NotFound(path) => FormationError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                path.display().to_string(),
            )),
            StorageError::Io(e) => FormationError::Io(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("no obligation for contract id: {0}")]
    NotFound(ContractId),
    #[error("invalid range: offset {offset} + length {length} exceeds file size {file_size}")]
    RangeInvalid {
        offset: u64,
        length: u64,
        file_size: u64,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Entry points the network layer calls into: contract formation and stored
/// data retrieval. The transport itself lives outside this crate.
pub struct Host {
    store: Arc<ObligationStore>,
    backend: Arc<StorageBackend>,
    writer: Writer,
}

impl Host {
    pub fn new(store: Arc<ObligationStore>, backend: Arc<StorageBackend>, writer: Writer) -> Self {
        Self {
            store,
            backend,
            writer,
        }
    }

    /// Persists the negotiated contract's data and registers the obligation.
    /// The data file is fully written and flushed before registration, and
    /// removed again on every failure path, so a schedulable obligation never
    /// references a partially written path.
    pub async fn accept_contract(
        &self,
        contract: FileContract,
        data: &mut impl Read,
    ) -> Result<ContractId, FormationError> {
        let id = contract.id();
        if self.store.get(id).is_some() {
            return Err(FormationError::DuplicateId(id));
        }
        let (mut file, path) = self.backend.allocate(contract.file_size)?;
        let result = self.ingest(id, contract, &mut file, &path, data).await;
        if result.is_err() {
            drop(file);
            if let Err(e) = self.backend.delete(&path) {
                warn!("Failed to clean up rejected contract data: {}", e);
            }
        }
        result
    }

    async fn ingest(
        &self,
        id: ContractId,
        contract: FileContract,
        file: &mut File,
        path: &Path,
        data: &mut impl Read,
    ) -> Result<ContractId, FormationError> {
        let written = io::copy(data, file)?;
        if written != contract.file_size {
            return Err(FormationError::SizeMismatch {
                expected: contract.file_size,
                written,
            });
        }
        file.sync_all()?;
        file.seek(SeekFrom::Start(0))?;
        let computed = merkle::reader_root(file, contract.file_size)?;
        if computed != contract.file_merkle_root {
            return Err(FormationError::MerkleMismatch {
                expected: contract.file_merkle_root,
                computed,
            });
        }

        let obligation = ContractObligation {
            id,
            proof_height: contract.start_height,
            status: Status::Pending,
            contract,
            path: path.to_owned(),
        };
        self.store
            .register(obligation.clone())
            .map_err(|_| FormationError::DuplicateId(id))?;
        if let Err(e) = self.writer.upsert_obligation(&obligation).await {
            self.store.retire(id);
            return Err(FormationError::Persistence(e.to_string()));
        }
        info!(
            "Accepted contract {} ({} bytes, first proof due at height {})",
            id, obligation.contract.file_size, obligation.proof_height
        );
        Ok(id)
    }

    /// Bounds-checked byte-range read of stored contract data.
    pub fn retrieve(
        &self,
        id: ContractId,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, RetrieveError> {
        let obligation = self.store.get(id).ok_or(RetrieveError::NotFound(id))?;
        let file_size = obligation.contract.file_size;
        if offset.checked_add(length).is_none_or(|end| end > file_size) {
            return Err(RetrieveError::RangeInvalid {
                offset,
                length,
                file_size,
            });
        }
        let mut file = match self.backend.open(&obligation.path) {
            Ok(file) => file,
            Err(StorageError::NotFound(_)) => return Err(RetrieveError::NotFound(id)),
            Err(StorageError::Io(e)) => return Err(e.into()),
            Err(e) => return Err(io::Error::other(e.to_string()).into()),
        };
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Restores persisted obligations into the in-memory store at startup.
    pub async fn load(&self, reader: &Reader) -> anyhow::Result<usize> {
        let mut count = 0;
        for obligation in reader.get_obligations().await? {
            match self.store.register(obligation) {
                Ok(()) => count += 1,
                Err(e) => warn!("Skipping persisted obligation: {}", e),
            }
        }
        Ok(count)
    }
}
