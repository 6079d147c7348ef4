//! Source processors.
//!
//! A [`SourceProcessor`] consumes a committed source and performs a derived
//! write. [`EntitySnapshotProcessor`] is the built-in one: it maintains
//! snapshots by folding each source's messages forward from the previous
//! latest snapshot and evaluating the entity's
//! [`SnapshotPolicy`](crate::snapshot::SnapshotPolicy) per message.
//! Multiple decisions to write the same pointer within one source collapse
//! into a single final write, flushed once per source.

use std::{collections::HashMap, fmt, future::Future, marker::PhantomData, pin::Pin};

use tokio_stream::StreamExt as _;

use crate::{
    entity::{ReplayError, State},
    pointer::{Pointer, Version},
    repository::DeltaWindow,
    snapshot::{SnapshotPolicy, SnapshotRepository},
    source::Source,
    store::SourceRepository,
};

/// Error type surfaced by processors; the reprocessor queue only logs it.
pub type ProcessorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed future returned by [`SourceProcessor::process`].
pub type ProcessorFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProcessorError>> + Send + 'a>>;

/// Consumes committed sources to maintain derived state (snapshots,
/// projections).
///
/// Object-safe so the reprocessor queue can hold heterogeneous processors;
/// implementations return a boxed future.
pub trait SourceProcessor<D>: Send + Sync {
    fn process<'a>(&'a self, source: &'a Source<D>) -> ProcessorFuture<'a>;
}

/// Snapshot maintenance processor.
///
/// For each entity a source touches: load the previous latest snapshot via
/// the configured cache chain, reduce forward through the source's messages
/// in order, and record whatever the entity's policy asks for.
pub struct EntitySnapshotProcessor<E, S, SS> {
    store: S,
    snapshots: SS,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S, SS> EntitySnapshotProcessor<E, S, SS> {
    #[must_use]
    pub const fn new(store: S, snapshots: SS) -> Self {
        Self {
            store,
            snapshots,
            _entity: PhantomData,
        }
    }
}

impl<E, S, SS> fmt::Debug for EntitySnapshotProcessor<E, S, SS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntitySnapshotProcessor(..)")
    }
}

impl<E, S, SS> EntitySnapshotProcessor<E, S, SS>
where
    E: SnapshotPolicy + Clone + Send + Sync,
    E::Delta: Clone + Send + Sync,
    S: SourceRepository<E::Delta>,
    SS: SnapshotRepository<E>,
{
    /// Reconstruct the state just before `version`, seeding from `seed` when
    /// it is usable and replaying the gap from the store otherwise.
    async fn state_before(
        &self,
        pointer: Pointer,
        seed: Option<&State<E>>,
    ) -> Result<State<E>, ProcessorError> {
        let target = Version::new(pointer.version.get() - 1);
        let mut state = match seed {
            Some(seed) if seed.version() <= target => seed.clone(),
            _ => State::construct(pointer.id),
        };
        if state.version() == target {
            return Ok(state);
        }

        let window = DeltaWindow {
            id: pointer.id,
            after: state.version(),
            through: Some(target),
        };
        let mut deltas = self.store.enumerate_deltas(&window);
        while let Some(delta) = deltas.next().await {
            let delta = delta.map_err(ProcessorError::from)?;
            if !state.can_reduce(&delta) {
                return Err(ReplayError {
                    pointer: state.pointer(),
                }
                .into());
            }
            state = state.reduce(&delta);
        }
        Ok(state)
    }
}

impl<E, S, SS> SourceProcessor<E::Delta> for EntitySnapshotProcessor<E, S, SS>
where
    E: SnapshotPolicy + Clone + Send + Sync,
    E::Delta: Clone + Send + Sync,
    S: SourceRepository<E::Delta>,
    SS: SnapshotRepository<E>,
{
    fn process<'a>(&'a self, source: &'a Source<E::Delta>) -> ProcessorFuture<'a> {
        Box::pin(async move {
            let mut pending: HashMap<Pointer, State<E>> = HashMap::new();

            for entity_id in source.entity_ids() {
                let mut previous_latest = self
                    .snapshots
                    .get_snapshot(Pointer::latest(entity_id))
                    .await
                    .map_err(ProcessorError::from)?;

                let mut messages = source.messages_for(entity_id).peekable();
                let Some(first) = messages.peek() else {
                    continue;
                };
                let first_pointer = first
                    .state_pointer()
                    .ok_or("unresolved message in committed source")?;

                let mut state = self
                    .state_before(first_pointer, previous_latest.as_ref())
                    .await?;

                for message in messages {
                    let pointer = message
                        .state_pointer()
                        .ok_or("unresolved message in committed source")?;
                    if state.pointer().next() != pointer {
                        return Err(format!(
                            "message sequence gap: expected {}, found {pointer}",
                            state.pointer().next()
                        )
                        .into());
                    }
                    if !state.can_reduce(&message.delta) {
                        return Err(ReplayError {
                            pointer: state.pointer(),
                        }
                        .into());
                    }
                    state = state.reduce(&message.delta);

                    if E::should_record(&state) {
                        pending.insert(state.pointer(), state.clone());
                    }
                    if E::should_record_as_latest(&state, previous_latest.as_ref()) {
                        pending.insert(Pointer::latest(entity_id), state.clone());
                        previous_latest = Some(state.clone());
                    }
                }
            }

            // One flush per processed source.
            let write_count = pending.len();
            for (pointer, snapshot) in &pending {
                self.snapshots
                    .put_snapshot(*pointer, snapshot)
                    .await
                    .map_err(ProcessorError::from)?;
            }
            tracing::debug!(source_id = %source.id, write_count, "snapshot maintenance complete");
            Ok(())
        })
    }
}
