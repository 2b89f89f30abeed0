use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("insufficient space: requested {requested} bytes, {remaining} remaining")]
    InsufficientSpace { requested: u64, remaining: u64 },
    #[error("stored file not found: {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Per-obligation data files under a single root directory, with capacity
/// accounting by reservation. Each path is owned by exactly one obligation
/// for its entire lifetime, so no per-path locking is needed; a reservation
/// covers the full contracted size even while the file is partially written.
pub struct StorageBackend {
    root: PathBuf,
    capacity: u64,
    reserved: Mutex<HashMap<PathBuf, u64>>,
}

impl StorageBackend {
    pub fn new(root: impl Into<PathBuf>, capacity: u64) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let mut reserved = HashMap::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            reserved.insert(entry.path(), entry.metadata()?.len());
        }
        let used: u64 = reserved.values().sum();
        debug!("Storage backend at {} using {} of {} bytes", root.display(), used, capacity);
        Ok(Self {
            root,
            capacity,
            reserved: Mutex::new(reserved),
        })
    }

    fn reserved(&self) -> MutexGuard<'_, HashMap<PathBuf, u64>> {
        self.reserved.lock().expect("storage accounting lock poisoned")
    }

    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.reserved().values().sum())
    }

    /// Reserves `size` bytes and creates a fresh file for them. Callers must
    /// fully write and flush the file before registering an obligation
    /// against the returned path.
    pub fn allocate(&self, size: u64) -> Result<(File, PathBuf), StorageError> {
        let mut reserved = self.reserved();
        let remaining = self.capacity.saturating_sub(reserved.values().sum());
        if size > remaining {
            return Err(StorageError::InsufficientSpace {
                requested: size,
                remaining,
            });
        }
        let name = format!("{}.dat", hex::encode(rand::random::<[u8; 16]>()));
        let path = self.root.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        reserved.insert(path.clone(), size);
        Ok((file, path))
    }

    pub fn open(&self, path: &Path) -> Result<File, StorageError> {
        File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_owned())
            } else {
                e.into()
            }
        })
    }

    /// Removes the file and releases its reservation. A no-op if the path is
    /// already gone.
    pub fn delete(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.reserved().remove(path);
        Ok(())
    }
}
