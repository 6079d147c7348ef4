//! Fault isolation for snapshot storage.
//!
//! Snapshots are a cache: an outage must degrade to "rebuild from source",
//! never fail the caller. [`FaultIsolating`] converts every storage error
//! from the wrapped repository into a default result (`None` for reads,
//! `false` for writes and deletes) after logging it. Its own error type is
//! [`Infallible`].
//!
//! The source repository gets no such treatment; it is the source of truth
//! and its failures propagate.

use std::convert::Infallible;

use crate::{
    entity::{Entity, State},
    pointer::Pointer,
    snapshot::SnapshotRepository,
};

/// Wrapper converting storage failures into cache misses.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaultIsolating<SS> {
    inner: SS,
}

impl<SS> FaultIsolating<SS> {
    #[must_use]
    pub const fn new(inner: SS) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> SS {
        self.inner
    }
}

impl<SS, E> SnapshotRepository<E> for FaultIsolating<SS>
where
    E: Entity + Send + Sync + 'static,
    SS: SnapshotRepository<E>,
{
    type Error = Infallible;

    async fn get_snapshot(&self, pointer: Pointer) -> Result<Option<State<E>>, Infallible> {
        match self.inner.get_snapshot(pointer).await {
            Ok(snapshot) => Ok(snapshot),
            Err(error) => {
                tracing::warn!(%error, %pointer, "snapshot read failed; treating as missing");
                Ok(None)
            }
        }
    }

    async fn put_snapshot(
        &self,
        pointer: Pointer,
        snapshot: &State<E>,
    ) -> Result<bool, Infallible> {
        match self.inner.put_snapshot(pointer, snapshot).await {
            Ok(stored) => Ok(stored),
            Err(error) => {
                tracing::warn!(%error, %pointer, "snapshot write failed; skipping");
                Ok(false)
            }
        }
    }

    async fn delete_snapshots(&self, pointers: &[Pointer]) -> Result<bool, Infallible> {
        match self.inner.delete_snapshots(pointers).await {
            Ok(deleted) => Ok(deleted),
            Err(error) => {
                tracing::warn!(%error, "snapshot delete failed; skipping");
                Ok(false)
            }
        }
    }
}
