//! Test-mode snapshot wrapper.
//!
//! Records every pointer written through it and deletes them all on
//! [`teardown`](TestMode::teardown), so a test run leaves the wrapped
//! repository exactly as it found it.

use std::{fmt, marker::PhantomData};

use tokio::sync::Mutex;

use crate::{
    entity::{Entity, State},
    pointer::Pointer,
    snapshot::SnapshotRepository,
};

/// Wrapper buffering written pointers for teardown.
pub struct TestMode<SS, E> {
    inner: SS,
    recorded: Mutex<Vec<Pointer>>,
    _entity: PhantomData<fn() -> E>,
}

impl<SS, E> TestMode<SS, E> {
    #[must_use]
    pub fn new(inner: SS) -> Self {
        Self {
            inner,
            recorded: Mutex::new(Vec::new()),
            _entity: PhantomData,
        }
    }
}

impl<SS, E> TestMode<SS, E>
where
    E: Entity + Send + Sync,
    SS: SnapshotRepository<E>,
{
    /// Delete every snapshot written through this wrapper.
    ///
    /// # Errors
    ///
    /// Returns the wrapped repository's error if the deletion fails; the
    /// recorded pointers are kept so teardown can be retried.
    pub async fn teardown(&self) -> Result<bool, SS::Error> {
        let pointers: Vec<Pointer> = {
            let recorded = self.recorded.lock().await;
            recorded.clone()
        };
        if pointers.is_empty() {
            return Ok(true);
        }
        let deleted = self.inner.delete_snapshots(&pointers).await?;
        if deleted {
            self.recorded.lock().await.clear();
        }
        Ok(deleted)
    }
}

impl<SS: fmt::Debug, E> fmt::Debug for TestMode<SS, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMode")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<SS, E> SnapshotRepository<E> for TestMode<SS, E>
where
    E: Entity + Send + Sync,
    SS: SnapshotRepository<E>,
{
    type Error = SS::Error;

    async fn get_snapshot(&self, pointer: Pointer) -> Result<Option<State<E>>, Self::Error> {
        self.inner.get_snapshot(pointer).await
    }

    async fn put_snapshot(
        &self,
        pointer: Pointer,
        snapshot: &State<E>,
    ) -> Result<bool, Self::Error> {
        let stored = self.inner.put_snapshot(pointer, snapshot).await?;
        if stored {
            self.recorded.lock().await.push(pointer);
        }
        Ok(stored)
    }

    async fn delete_snapshots(&self, pointers: &[Pointer]) -> Result<bool, Self::Error> {
        self.inner.delete_snapshots(pointers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pointer::Id,
        snapshot::inmemory,
        test::{Ledger, LedgerDelta},
    };

    #[tokio::test]
    async fn teardown_deletes_everything_written_through_the_wrapper() {
        let base = inmemory::Store::new();
        let test_mode: TestMode<_, Ledger> = TestMode::new(base.clone());

        let id = Id::random();
        let state = State::<Ledger>::construct(id).reduce(&LedgerDelta::Deposited { amount: 1 });
        assert!(test_mode.put_snapshot(state.pointer(), &state).await.unwrap());
        assert!(
            test_mode
                .put_snapshot(Pointer::latest(id), &state)
                .await
                .unwrap()
        );
        assert_eq!(base.len(), 2);

        assert!(test_mode.teardown().await.unwrap());
        assert!(base.is_empty());
    }

    #[tokio::test]
    async fn teardown_leaves_external_snapshots_alone() {
        let base = inmemory::Store::new();
        let test_mode: TestMode<_, Ledger> = TestMode::new(base.clone());

        let external =
            State::<Ledger>::construct(Id::random()).reduce(&LedgerDelta::Deposited { amount: 1 });
        assert!(base.put_snapshot(external.pointer(), &external).await.unwrap());

        let own =
            State::<Ledger>::construct(Id::random()).reduce(&LedgerDelta::Deposited { amount: 2 });
        assert!(test_mode.put_snapshot(own.pointer(), &own).await.unwrap());

        assert!(test_mode.teardown().await.unwrap());
        assert_eq!(base.len(), 1);
    }
}
