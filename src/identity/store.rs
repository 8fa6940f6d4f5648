//! Identity storage.
//!
//! `MemoryIdentityStore` keeps identities in a concurrent map with a secondary
//! email index. When a snapshot path is configured every save rewrites a JSON
//! snapshot so identities survive restarts.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::model::Identity;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("identity store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("identity snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Lookup and persistence of identities.
///
/// Implementations must enforce email uniqueness in `save`.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Insert or replace the identity with the same id.
    async fn save(&self, identity: Identity) -> Result<(), StoreError>;
}

/// A thread-safe in-process identity store.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    inner: Arc<DashMap<Uuid, Identity>>,
    emails: Arc<DashMap<String, Uuid>>,
    snapshot_path: Option<PathBuf>,
    snapshot_lock: Arc<Mutex<()>>,
}

impl MemoryIdentityStore {
    /// Create a new empty store.
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            snapshot_path,
            ..Self::default()
        }
    }

    /// Load from the snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let identities: Vec<Identity> = serde_json::from_reader(reader)?;
            for identity in identities {
                store.emails.insert(identity.email.clone(), identity.id);
                store.inner.insert(identity.id, identity);
            }
            tracing::info!(count = store.inner.len(), path = %path.display(), "Loaded identity snapshot");
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Rewrite the snapshot on the blocking pool. A no-op without a path.
    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(());
        };
        let inner = self.inner.clone();
        let lock = self.snapshot_lock.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &inner, &lock))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    /// Undo a `save` of `id` under `email`, restoring `previous` if there was one.
    fn rollback(&self, id: Uuid, email: &str, previous: Option<Identity>) {
        match previous {
            Some(previous) => {
                if previous.email != email {
                    self.emails.remove(email);
                    self.emails.insert(previous.email.clone(), id);
                }
                self.inner.insert(id, previous);
            }
            None => {
                self.emails.remove(email);
                self.inner.remove(&id);
            }
        }
    }
}

fn write_snapshot(
    path: &Path,
    inner: &DashMap<Uuid, Identity>,
    lock: &Mutex<()>,
) -> Result<(), StoreError> {
    let _guard = lock.lock().expect("snapshot mutex poisoned");

    let identities: Vec<Identity> = inner.iter().map(|r| r.value().clone()).collect();
    let tmp = path.with_extension("tmp");
    {
        let writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(writer, &identities)?;
    }
    std::fs::rename(&tmp, path)?;
    tracing::debug!(count = identities.len(), "Saved identity snapshot");
    Ok(())
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let id = match self.emails.get(email) {
            Some(r) => *r.value(),
            None => return Ok(None),
        };
        Ok(self.inner.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.inner.get(&id).map(|r| r.value().clone()))
    }

    async fn save(&self, identity: Identity) -> Result<(), StoreError> {
        let previous = self.inner.get(&identity.id).map(|r| r.value().clone());

        match self.emails.entry(identity.email.clone()) {
            Entry::Occupied(owner) if *owner.get() != identity.id => {
                return Err(StoreError::DuplicateEmail);
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(identity.id);
            }
        }

        if let Some(previous) = &previous {
            if previous.email != identity.email {
                self.emails.remove(&previous.email);
            }
        }

        let (id, email) = (identity.id, identity.email.clone());
        self.inner.insert(id, identity);
        if let Err(e) = self.persist().await {
            tracing::error!(identity = %id, error = %e, "Identity snapshot failed, save rolled back");
            self.rollback(id, &email, previous);
            return Err(e);
        }
        Ok(())
    }
}
