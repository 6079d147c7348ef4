//! Snapshot repository and recording policy.
//!
//! Snapshots cache materialized entity state at a pointer so loads can
//! resume a fold instead of replaying from version zero. They are never a
//! source of truth: losing one never loses data, and a failing snapshot
//! backend degrades to full replay.
//!
//! The *whether to record* decisions live on the snapshot type itself, via
//! [`SnapshotPolicy`], not on the repository; processors evaluate the policy
//! per message and batch the resulting writes (see
//! [`EntitySnapshotProcessor`](crate::processor::EntitySnapshotProcessor)).
//!
//! The "latest known" slot is addressed with the version-zero sentinel
//! pointer ([`Pointer::latest`]); exact versions are addressed directly.

use std::{convert::Infallible, future::Future};

use crate::{
    entity::{Entity, State},
    pointer::Pointer,
};

pub mod caching;
pub mod fault;
pub mod inmemory;
pub mod testmode;

/// Persistence contract for snapshots.
///
/// Wrapper layers ([`caching`], [`fault`], [`testmode`]) compose over any
/// base implementation.
pub trait SnapshotRepository<E: Entity>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the snapshot stored at the given pointer, if any.
    ///
    /// Use [`Pointer::latest`] for the latest-known slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn get_snapshot<'a>(
        &'a self,
        pointer: Pointer,
    ) -> impl Future<Output = Result<Option<State<E>>, Self::Error>> + Send + 'a;

    /// Store a snapshot at the given pointer, overwriting any existing one.
    ///
    /// Returns whether the snapshot was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn put_snapshot<'a>(
        &'a self,
        pointer: Pointer,
        snapshot: &'a State<E>,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

    /// Delete the snapshots stored at the given pointers.
    ///
    /// Returns whether the deletion took effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn delete_snapshots<'a>(
        &'a self,
        pointers: &'a [Pointer],
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

/// Recording policy, implemented by the snapshot (entity) type itself.
pub trait SnapshotPolicy: Entity {
    /// Whether to record this exact version, independent of the latest slot.
    ///
    /// Defaults to never.
    fn should_record(state: &State<Self>) -> bool {
        let _ = state;
        false
    }

    /// Whether to overwrite the latest-known slot with this state.
    ///
    /// Defaults to "newer versions win".
    fn should_record_as_latest(state: &State<Self>, previous_latest: Option<&State<Self>>) -> bool {
        previous_latest.is_none_or(|previous| previous.version() < state.version())
    }
}

/// No-op snapshot repository; the default when snapshots are not configured.
///
/// Loads find nothing, puts are declined, deletes trivially succeed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSnapshotRepository;

impl NoSnapshotRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<E> SnapshotRepository<E> for NoSnapshotRepository
where
    E: Entity + Send + Sync + 'static,
{
    type Error = Infallible;

    async fn get_snapshot(&self, _pointer: Pointer) -> Result<Option<State<E>>, Infallible> {
        Ok(None)
    }

    async fn put_snapshot(
        &self,
        _pointer: Pointer,
        _snapshot: &State<E>,
    ) -> Result<bool, Infallible> {
        Ok(false)
    }

    async fn delete_snapshots(&self, _pointers: &[Pointer]) -> Result<bool, Infallible> {
        Ok(true)
    }
}
