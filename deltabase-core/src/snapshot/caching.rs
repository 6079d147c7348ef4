//! Caching wrappers over a base snapshot repository.
//!
//! [`UnitOfWorkCache`] keeps a per-unit-of-work read/write cache so one
//! batch never fetches the same pointer twice. [`SharedReadCache`] shares a
//! [`SnapshotCache`] across the processors consuming the same source, so a
//! snapshot fetched by one processor is not re-fetched by another.

use std::{collections::HashMap, fmt, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    entity::{Entity, State},
    pointer::Pointer,
    snapshot::SnapshotRepository,
};

/// Per-unit-of-work read/write cache.
///
/// Caches both hits and misses: within one unit of work a miss stays a miss
/// until this wrapper itself writes the pointer. Intended to live exactly as
/// long as the batch it serves.
pub struct UnitOfWorkCache<SS, E: Entity> {
    inner: SS,
    cache: Mutex<HashMap<Pointer, Option<State<E>>>>,
}

impl<SS, E: Entity> UnitOfWorkCache<SS, E> {
    #[must_use]
    pub fn new(inner: SS) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn into_inner(self) -> SS {
        self.inner
    }
}

impl<SS: fmt::Debug, E: Entity> fmt::Debug for UnitOfWorkCache<SS, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWorkCache")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<SS, E> SnapshotRepository<E> for UnitOfWorkCache<SS, E>
where
    E: Entity + Clone + Send + Sync,
    SS: SnapshotRepository<E>,
{
    type Error = SS::Error;

    async fn get_snapshot(&self, pointer: Pointer) -> Result<Option<State<E>>, Self::Error> {
        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.get(&pointer) {
            tracing::trace!(%pointer, "snapshot served from unit-of-work cache");
            return Ok(entry.clone());
        }
        let fetched = self.inner.get_snapshot(pointer).await?;
        cache.insert(pointer, fetched.clone());
        Ok(fetched)
    }

    async fn put_snapshot(
        &self,
        pointer: Pointer,
        snapshot: &State<E>,
    ) -> Result<bool, Self::Error> {
        let stored = self.inner.put_snapshot(pointer, snapshot).await?;
        if stored {
            self.cache.lock().await.insert(pointer, Some(snapshot.clone()));
        }
        Ok(stored)
    }

    async fn delete_snapshots(&self, pointers: &[Pointer]) -> Result<bool, Self::Error> {
        let deleted = self.inner.delete_snapshots(pointers).await?;
        if deleted {
            let mut cache = self.cache.lock().await;
            for pointer in pointers {
                cache.insert(*pointer, None);
            }
        }
        Ok(deleted)
    }
}

/// Pointer-keyed snapshot cache shared across subscribers.
///
/// Handles are cheap clones over shared state. Only positive entries are
/// cached: a miss by one subscriber must not hide a snapshot another
/// subscriber writes moments later.
pub struct SnapshotCache<E: Entity> {
    entries: Arc<Mutex<HashMap<Pointer, State<E>>>>,
}

impl<E: Entity> SnapshotCache<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<E: Entity> Default for SnapshotCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for SnapshotCache<E> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<E: Entity> fmt::Debug for SnapshotCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SnapshotCache(..)")
    }
}

/// Subscriber-optimized wrapper sharing a [`SnapshotCache`] with its peers.
pub struct SharedReadCache<SS, E: Entity> {
    inner: SS,
    cache: SnapshotCache<E>,
}

impl<SS, E: Entity> SharedReadCache<SS, E> {
    #[must_use]
    pub fn new(inner: SS, cache: SnapshotCache<E>) -> Self {
        Self { inner, cache }
    }
}

impl<SS: fmt::Debug, E: Entity> fmt::Debug for SharedReadCache<SS, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReadCache")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<SS, E> SnapshotRepository<E> for SharedReadCache<SS, E>
where
    E: Entity + Clone + Send + Sync,
    SS: SnapshotRepository<E>,
{
    type Error = SS::Error;

    async fn get_snapshot(&self, pointer: Pointer) -> Result<Option<State<E>>, Self::Error> {
        {
            let entries = self.cache.entries.lock().await;
            if let Some(entry) = entries.get(&pointer) {
                tracing::trace!(%pointer, "snapshot served from shared cache");
                return Ok(Some(entry.clone()));
            }
        }
        let fetched = self.inner.get_snapshot(pointer).await?;
        if let Some(ref snapshot) = fetched {
            self.cache
                .entries
                .lock()
                .await
                .insert(pointer, snapshot.clone());
        }
        Ok(fetched)
    }

    async fn put_snapshot(
        &self,
        pointer: Pointer,
        snapshot: &State<E>,
    ) -> Result<bool, Self::Error> {
        let stored = self.inner.put_snapshot(pointer, snapshot).await?;
        if stored {
            self.cache
                .entries
                .lock()
                .await
                .insert(pointer, snapshot.clone());
        }
        Ok(stored)
    }

    async fn delete_snapshots(&self, pointers: &[Pointer]) -> Result<bool, Self::Error> {
        let deleted = self.inner.delete_snapshots(pointers).await?;
        if deleted {
            let mut entries = self.cache.entries.lock().await;
            for pointer in pointers {
                entries.remove(pointer);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        pointer::Id,
        snapshot::inmemory,
        test::{Ledger, LedgerDelta},
    };

    /// Counts reads passed through to the wrapped repository.
    struct Counting {
        inner: inmemory::Store,
        reads: AtomicUsize,
    }

    impl Counting {
        fn new(inner: inmemory::Store) -> Self {
            Self {
                inner,
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl SnapshotRepository<Ledger> for Counting {
        type Error = inmemory::Error;

        async fn get_snapshot(
            &self,
            pointer: Pointer,
        ) -> Result<Option<State<Ledger>>, Self::Error> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_snapshot(pointer).await
        }

        async fn put_snapshot(
            &self,
            pointer: Pointer,
            snapshot: &State<Ledger>,
        ) -> Result<bool, Self::Error> {
            self.inner.put_snapshot(pointer, snapshot).await
        }

        async fn delete_snapshots(&self, pointers: &[Pointer]) -> Result<bool, Self::Error> {
            SnapshotRepository::<Ledger>::delete_snapshots(&self.inner, pointers).await
        }
    }

    fn sample(id: Id) -> State<Ledger> {
        State::construct(id).reduce(&LedgerDelta::Deposited { amount: 1 })
    }

    #[tokio::test]
    async fn unit_of_work_cache_reads_each_pointer_once() {
        let counting = Counting::new(inmemory::Store::new());
        let cached = UnitOfWorkCache::new(counting);
        let pointer = Pointer::latest(Id::random());

        for _ in 0..3 {
            let missing: Option<State<Ledger>> = cached.get_snapshot(pointer).await.unwrap();
            assert!(missing.is_none());
        }
        assert_eq!(cached.into_inner().reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unit_of_work_cache_serves_own_writes() {
        let counting = Counting::new(inmemory::Store::new());
        let cached = UnitOfWorkCache::new(counting);
        let state = sample(Id::random());

        assert!(cached.put_snapshot(state.pointer(), &state).await.unwrap());
        let loaded = cached
            .get_snapshot(state.pointer())
            .await
            .unwrap()
            .expect("written through this cache");
        assert_eq!(loaded, state);
        assert_eq!(cached.into_inner().reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shared_cache_spans_multiple_wrappers() {
        let base = inmemory::Store::new();
        let cache = SnapshotCache::new();
        let first = SharedReadCache::new(Counting::new(base.clone()), cache.clone());
        let second = SharedReadCache::new(Counting::new(base.clone()), cache);

        let state = sample(Id::random());
        assert!(base.put_snapshot(state.pointer(), &state).await.unwrap());

        let _: Option<State<Ledger>> = first.get_snapshot(state.pointer()).await.unwrap();
        let _: Option<State<Ledger>> = second.get_snapshot(state.pointer()).await.unwrap();

        assert_eq!(first.inner.reads.load(Ordering::SeqCst), 1);
        assert_eq!(second.inner.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shared_cache_does_not_cache_misses() {
        let base = inmemory::Store::new();
        let cache = SnapshotCache::new();
        let wrapper = SharedReadCache::new(Counting::new(base.clone()), cache);
        let state = sample(Id::random());

        let missing: Option<State<Ledger>> =
            wrapper.get_snapshot(state.pointer()).await.unwrap();
        assert!(missing.is_none());

        // Written behind the wrapper's back; the next read must see it.
        assert!(base.put_snapshot(state.pointer(), &state).await.unwrap());
        let found = wrapper
            .get_snapshot(state.pointer())
            .await
            .unwrap()
            .expect("visible after external write");
        assert_eq!(found, state);
    }
}
