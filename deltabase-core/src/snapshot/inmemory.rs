//! In-memory snapshot repository.
//!
//! Reference implementation suitable for tests and development. Snapshots
//! are stored as `serde_json::Value` payloads keyed by pointer, behind
//! `Arc<RwLock<…>>` so handles are cheap clones over shared state.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    entity::{Entity, State},
    pointer::Pointer,
    snapshot::SnapshotRepository,
};

/// Error type for the in-memory snapshot repository.
#[derive(Debug, Error)]
pub enum Error {
    #[error("snapshot serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("snapshot deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}

/// In-memory snapshot repository.
#[derive(Clone, Debug, Default)]
pub struct Store {
    snapshots: Arc<RwLock<HashMap<Pointer, serde_json::Value>>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .expect("snapshot store lock poisoned")
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> SnapshotRepository<E> for Store
where
    E: Entity + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Error = Error;

    #[tracing::instrument(skip(self))]
    async fn get_snapshot(&self, pointer: Pointer) -> Result<Option<State<E>>, Error> {
        let stored = {
            let snapshots = self.snapshots.read().expect("snapshot store lock poisoned");
            snapshots.get(&pointer).cloned()
        };
        let snapshot = match stored {
            Some(value) => {
                Some(serde_json::from_value(value).map_err(Error::Deserialization)?)
            }
            None => None,
        };
        tracing::trace!(found = snapshot.is_some(), "snapshot lookup");
        Ok(snapshot)
    }

    #[tracing::instrument(skip(self, snapshot))]
    async fn put_snapshot(&self, pointer: Pointer, snapshot: &State<E>) -> Result<bool, Error> {
        let value = serde_json::to_value(snapshot).map_err(Error::Serialization)?;
        let mut snapshots = self
            .snapshots
            .write()
            .expect("snapshot store lock poisoned");
        snapshots.insert(pointer, value);
        tracing::trace!("snapshot stored");
        Ok(true)
    }

    #[tracing::instrument(skip(self), fields(pointer_count = pointers.len()))]
    async fn delete_snapshots(&self, pointers: &[Pointer]) -> Result<bool, Error> {
        let mut snapshots = self
            .snapshots
            .write()
            .expect("snapshot store lock poisoned");
        for pointer in pointers {
            snapshots.remove(pointer);
        }
        Ok(true)
    }
}
