use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use indexmap::IndexSet;
use thiserror::Error;

use crate::types::{BlockHeight, ContractId, ContractObligation, Status};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate contract id: {0}")]
    DuplicateId(ContractId),
    #[error("no obligation for contract id: {0}")]
    NotFound(ContractId),
}

#[derive(Default)]
struct Indices {
    by_id: HashMap<ContractId, ContractObligation>,
    by_height: BTreeMap<BlockHeight, IndexSet<ContractId>>,
}

/// Authoritative in-memory index of live obligations, keyed by contract id
/// and by the height of the next due proof action. The mutex is held for
/// index mutation only; proof I/O runs on snapshots returned by `due_at`.
#[derive(Default)]
pub struct ObligationStore {
    indices: Mutex<Indices>,
}

impl ObligationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Indices> {
        self.indices.lock().expect("obligation index lock poisoned")
    }

    /// Inserts into both indices atomically.
    pub fn register(&self, obligation: ContractObligation) -> Result<(), StoreError> {
        let mut indices = self.lock();
        if indices.by_id.contains_key(&obligation.id) {
            return Err(StoreError::DuplicateId(obligation.id));
        }
        indices
            .by_height
            .entry(obligation.proof_height)
            .or_default()
            .insert(obligation.id);
        indices.by_id.insert(obligation.id, obligation);
        Ok(())
    }

    /// Cloned snapshot of every obligation scheduled at or below `height`, in
    /// stable bucket order. Entries are not removed.
    pub fn due_at(&self, height: BlockHeight) -> Vec<ContractObligation> {
        let indices = self.lock();
        let Indices { by_id, by_height } = &*indices;
        by_height
            .range(..=height)
            .flat_map(|(_, ids)| ids)
            .filter_map(|id| by_id.get(id).cloned())
            .collect()
    }

    pub fn get(&self, id: ContractId) -> Option<ContractObligation> {
        self.lock().by_id.get(&id).cloned()
    }

    /// Moves the obligation to a new height bucket and resets it to
    /// `Pending`, atomically. Fails if it was concurrently retired.
    pub fn reschedule(&self, id: ContractId, new_height: BlockHeight) -> Result<(), StoreError> {
        let mut indices = self.lock();
        let old_height = match indices.by_id.get_mut(&id) {
            Some(obligation) => {
                let old = obligation.proof_height;
                obligation.proof_height = new_height;
                obligation.status = Status::Pending;
                old
            }
            None => return Err(StoreError::NotFound(id)),
        };
        remove_from_bucket(&mut indices.by_height, old_height, id);
        indices.by_height.entry(new_height).or_default().insert(id);
        Ok(())
    }

    pub fn set_status(&self, id: ContractId, status: Status) -> Result<(), StoreError> {
        let mut indices = self.lock();
        match indices.by_id.get_mut(&id) {
            Some(obligation) => {
                obligation.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    /// Removes the obligation from both indices. Idempotent: returns `None`
    /// without error if already absent, tolerating races between settlement
    /// confirmation and the expiration sweep.
    pub fn retire(&self, id: ContractId) -> Option<ContractObligation> {
        let mut indices = self.lock();
        let obligation = indices.by_id.remove(&id)?;
        remove_from_bucket(&mut indices.by_height, obligation.proof_height, id);
        Some(obligation)
    }

    /// Obligations whose expiration height has passed at `height`.
    pub fn expired_at(&self, height: BlockHeight) -> Vec<ContractObligation> {
        self.lock()
            .by_id
            .values()
            .filter(|obligation| obligation.contract.expiration_height <= height)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_from_bucket(
    by_height: &mut BTreeMap<BlockHeight, IndexSet<ContractId>>,
    height: BlockHeight,
    id: ContractId,
) {
    let emptied = match by_height.get_mut(&height) {
        Some(bucket) => {
            bucket.shift_remove(&id);
            bucket.is_empty()
        }
        None => false,
    };
    if emptied {
        by_height.remove(&height);
    }
}
