//! Multi- and single-entity units of work.
//!
//! A [`MultiRepository`] loads or creates entities, stages the messages
//! produced by appending deltas, and commits them as one atomic source. It
//! is a single-writer, single-use value owned by one logical caller; nothing
//! here is thread-safe by design.
//!
//! Contention is not an error: [`MultiRepository::commit`] returns
//! `Ok(false)` when the optimistic-concurrency check rejects the source, and
//! the caller's recovery is a fresh unit of work: reload and retry.

use std::collections::HashMap;

use nonempty::NonEmpty;
use thiserror::Error;
use tokio_stream::StreamExt as _;

use crate::{
    agent::Agent,
    entity::{Entity, ReplayError, State},
    pointer::{Id, Pointer, Version},
    query::{MessageFilterBuilder, MessageQuery, MessageSortBuilder},
    snapshot::{NoSnapshotRepository, SnapshotRepository},
    source::{Message, Source},
    store::SourceRepository,
};

/// Programmer-usage errors. Fatal to the current unit of work, never
/// retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum UsageError {
    /// The entity was not loaded or created in this unit of work.
    #[error("entity {0} is not known to this unit of work")]
    UnknownEntityId(Id),
    /// The entity is already loaded or created in this unit of work.
    #[error("entity {0} is already known to this unit of work")]
    ExistingEntity(Id),
    /// The delta failed `can_reduce` against the current state.
    #[error("delta cannot be reduced onto entity {entity_id} at version {version}")]
    IrreducibleDelta { entity_id: Id, version: Version },
}

/// Errors from [`MultiRepository::load`].
///
/// The variant kind indicates whether retrying with the same inputs could
/// ever succeed: usage errors and missing state never heal by retry within
/// the same unit of work; store errors might.
#[derive(Debug, Error)]
pub enum LoadError<StoreError>
where
    StoreError: std::error::Error + 'static,
{
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// No committed state satisfies the requested pointer.
    #[error("no state satisfies the requested pointer {0}")]
    StateDoesNotExist(Pointer),
    /// The source repository failed; correctness-critical, so it propagates.
    #[error("failed to enumerate deltas: {0}")]
    Store(#[source] StoreError),
    /// Committed history failed to replay; the stored data is unusable.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Message query for one entity's deltas in a version window, oldest first.
pub(crate) struct DeltaWindow {
    pub(crate) id: Id,
    pub(crate) after: Version,
    pub(crate) through: Option<Version>,
}

impl MessageQuery for DeltaWindow {
    fn get_filter<B: MessageFilterBuilder>(&self, builder: &B) -> B::Filter {
        let mut parts = vec![
            builder.entity_id_in(&[self.id]),
            builder.version_gte(self.after.next()),
        ];
        if let Some(through) = self.through {
            parts.push(builder.version_lte(through));
        }
        builder.all_of(parts)
    }

    fn get_sort<B: MessageSortBuilder>(&self, builder: &B) -> Option<B::Sort> {
        Some(builder.entity_version(true))
    }
}

/// A single-writer, single-use unit of work over one or more entities.
///
/// Generic over the entity type `E`, the source repository `S`, the agent
/// `A`, and the snapshot repository `SS` (none by default; see
/// [`with_snapshots`](MultiRepository::with_snapshots)).
pub struct MultiRepository<E, S, A, SS = NoSnapshotRepository>
where
    E: Entity,
{
    store: S,
    agent: A,
    snapshots: SS,
    signature_profile: String,
    known: HashMap<Id, State<E>>,
    staged: Vec<Message<E::Delta>>,
}

impl<E, S, A, SS> std::fmt::Debug for MultiRepository<E, S, A, SS>
where
    E: Entity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiRepository")
            .field("signature_profile", &self.signature_profile)
            .field("known", &self.known.len())
            .field("staged", &self.staged.len())
            .finish_non_exhaustive()
    }
}

impl<E, S, A> MultiRepository<E, S, A>
where
    E: Entity,
{
    #[must_use]
    pub fn new(store: S, agent: A, signature_profile: impl Into<String>) -> Self {
        Self {
            store,
            agent,
            snapshots: NoSnapshotRepository::new(),
            signature_profile: signature_profile.into(),
            known: HashMap::new(),
            staged: Vec::new(),
        }
    }
}

impl<E, S, A, SS> MultiRepository<E, S, A, SS>
where
    E: Entity,
{
    /// Configure a snapshot repository consulted by [`load`]
    /// (snapshot failures degrade to full replay).
    ///
    /// [`load`]: MultiRepository::load
    #[must_use]
    pub fn with_snapshots<SS2>(self, snapshots: SS2) -> MultiRepository<E, S, A, SS2> {
        MultiRepository {
            store: self.store,
            agent: self.agent,
            snapshots,
            signature_profile: self.signature_profile,
            known: self.known,
            staged: self.staged,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Messages staged for the next commit, in append order.
    #[must_use]
    pub fn staged(&self) -> &[Message<E::Delta>] {
        &self.staged
    }

    /// Register a brand-new entity at version zero.
    ///
    /// Nothing is persisted until [`commit`](MultiRepository::commit); the
    /// concurrency check protects against the id already existing in the
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::ExistingEntity`] if the id is already known to
    /// this unit of work.
    pub fn create(&mut self, id: Id) -> Result<&State<E>, UsageError> {
        if self.known.contains_key(&id) {
            return Err(UsageError::ExistingEntity(id));
        }
        Ok(self.known.entry(id).or_insert_with(|| State::construct(id)))
    }

    /// The current in-memory state of a known entity.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::UnknownEntityId`] if the entity was not loaded
    /// or created in this unit of work.
    pub fn get(&self, id: Id) -> Result<&State<E>, UsageError> {
        self.known.get(&id).ok_or(UsageError::UnknownEntityId(id))
    }

    /// Reduce a delta onto a known entity and stage the resulting message.
    ///
    /// The delta's lease/tag effects are resolved here, once.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::UnknownEntityId`] if the entity is not known,
    /// or [`UsageError::IrreducibleDelta`] if the delta fails `can_reduce`
    /// against the current state.
    pub fn append(&mut self, id: Id, delta: E::Delta) -> Result<(), UsageError> {
        let Some(state) = self.known.remove(&id) else {
            return Err(UsageError::UnknownEntityId(id));
        };
        if !state.can_reduce(&delta) {
            let version = state.version();
            self.known.insert(id, state);
            return Err(UsageError::IrreducibleDelta {
                entity_id: id,
                version,
            });
        }
        let next = state.reduce(&delta);
        let message = Message::bind(next.pointer(), delta);
        self.known.insert(id, next);
        self.staged.push(message);
        Ok(())
    }
}

impl<E, S, A, SS> MultiRepository<E, S, A, SS>
where
    E: Entity,
    E::Delta: Clone + Send + Sync,
    S: SourceRepository<E::Delta>,
    A: Agent,
    SS: SnapshotRepository<E>,
{
    /// Load an entity at the requested pointer.
    ///
    /// Fetches a usable snapshot (or constructs fresh), then replays deltas
    /// from the snapshot's version up to the requested version, or through
    /// the end of the stream for a latest request. Snapshot read failures
    /// are logged and degrade to full replay.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::ExistingEntity`] if the id is already known to
    /// this unit of work, [`LoadError::StateDoesNotExist`] if the replayed
    /// state does not satisfy the request, and [`LoadError::Store`] /
    /// [`LoadError::Replay`] for unusable storage.
    pub async fn load(&mut self, pointer: Pointer) -> Result<&State<E>, LoadError<S::Error>> {
        let id = pointer.id;
        if self.known.contains_key(&id) {
            return Err(UsageError::ExistingEntity(id).into());
        }

        let snapshot = fetch_snapshot(&self.snapshots, pointer).await;
        let mut state = snapshot.unwrap_or_else(|| State::construct(id));

        let satisfied_exactly =
            !pointer.is_latest_request() && state.version() == pointer.version;
        if !satisfied_exactly {
            let window = DeltaWindow {
                id,
                after: state.version(),
                through: (!pointer.is_latest_request()).then_some(pointer.version),
            };
            let mut deltas = self.store.enumerate_deltas(&window);
            while let Some(delta) = deltas.next().await {
                let delta = delta.map_err(LoadError::Store)?;
                if !state.can_reduce(&delta) {
                    return Err(ReplayError {
                        pointer: state.pointer(),
                    }
                    .into());
                }
                state = state.reduce(&delta);
            }
        }

        if !state.pointer().satisfies(pointer) {
            return Err(LoadError::StateDoesNotExist(pointer));
        }
        tracing::debug!(entity_id = %id, version = %state.version(), "entity loaded");
        Ok(self.known.entry(id).or_insert(state))
    }

    /// Commit all staged messages as one atomic source.
    ///
    /// A no-op success when nothing is staged. Otherwise the agent is
    /// consulted exactly once for provenance, a source with a fresh id is
    /// assembled, and the store commits it. Returns `Ok(false)` only on
    /// optimistic-concurrency rejection (including lease conflicts); staged
    /// messages are cleared only on success.
    ///
    /// # Errors
    ///
    /// Returns the store's error for usage defects and storage failures;
    /// never for ordinary contention.
    pub async fn commit(&mut self) -> Result<bool, S::Error> {
        let Some(messages) = NonEmpty::from_vec(self.staged.clone()) else {
            tracing::debug!("nothing staged; commit is a no-op");
            return Ok(true);
        };
        let stamp = self.agent.stamp(&self.signature_profile).await;
        let source = Source::new(Id::random(), stamp.timestamp, stamp.signature, messages);
        let source_id = source.id;

        let committed = self.store.commit(source).await?;
        if committed {
            tracing::debug!(%source_id, message_count = self.staged.len(), "source committed");
            self.staged.clear();
        } else {
            tracing::warn!(%source_id, "source rejected by concurrency check; reload and retry");
        }
        Ok(committed)
    }
}

/// Best-effort snapshot lookup for a load request. Failures are logged and
/// treated as misses; a snapshot beyond an exact-version request is
/// unusable and discarded.
async fn fetch_snapshot<E, SS>(snapshots: &SS, pointer: Pointer) -> Option<State<E>>
where
    E: Entity,
    SS: SnapshotRepository<E>,
{
    let tolerant_get = |slot: Pointer| async move {
        snapshots
            .get_snapshot(slot)
            .await
            .inspect_err(|error| {
                tracing::error!(%error, %slot, "failed to load snapshot, falling back to replay");
            })
            .ok()
            .flatten()
    };

    if !pointer.is_latest_request() {
        if let Some(snapshot) = tolerant_get(pointer).await {
            return Some(snapshot);
        }
    }
    tolerant_get(Pointer::latest(pointer.id))
        .await
        .filter(|snapshot| {
            pointer.is_latest_request() || snapshot.version() <= pointer.version
        })
}

/// A facade binding a unit of work to one entity.
///
/// Exists to give single-aggregate callers a narrower, mistake-resistant
/// surface: no ids to repeat, no way to touch another entity.
pub struct SingleRepository<E, S, A, SS = NoSnapshotRepository>
where
    E: Entity,
{
    repository: MultiRepository<E, S, A, SS>,
    id: Id,
}

impl<E, S, A, SS> std::fmt::Debug for SingleRepository<E, S, A, SS>
where
    E: Entity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleRepository")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<E, S, A, SS> SingleRepository<E, S, A, SS>
where
    E: Entity,
{
    /// Bind to a brand-new entity registered at version zero.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::ExistingEntity`] if the id is already known to
    /// the given unit of work.
    pub fn create(
        mut repository: MultiRepository<E, S, A, SS>,
        id: Id,
    ) -> Result<Self, UsageError> {
        repository.create(id)?;
        Ok(Self { repository, id })
    }

    /// The bound entity's current in-memory state.
    #[must_use]
    pub fn get(&self) -> &State<E> {
        match self.repository.get(self.id) {
            Ok(state) => state,
            Err(_) => unreachable!("the bound entity is registered at construction"),
        }
    }

    /// Reduce a delta onto the bound entity and stage the message.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::IrreducibleDelta`] if the delta fails
    /// `can_reduce` against the current state.
    pub fn append(&mut self, delta: E::Delta) -> Result<(), UsageError> {
        self.repository.append(self.id, delta)
    }

    /// Recover the underlying multi-entity unit of work.
    #[must_use]
    pub fn into_inner(self) -> MultiRepository<E, S, A, SS> {
        self.repository
    }
}

impl<E, S, A, SS> SingleRepository<E, S, A, SS>
where
    E: Entity,
    E::Delta: Clone + Send + Sync,
    S: SourceRepository<E::Delta>,
    A: Agent,
    SS: SnapshotRepository<E>,
{
    /// Bind to an existing entity loaded at the given pointer.
    ///
    /// # Errors
    ///
    /// As [`MultiRepository::load`].
    pub async fn load(
        mut repository: MultiRepository<E, S, A, SS>,
        pointer: Pointer,
    ) -> Result<Self, LoadError<S::Error>> {
        repository.load(pointer).await?;
        Ok(Self {
            repository,
            id: pointer.id,
        })
    }

    /// Commit the staged messages; see [`MultiRepository::commit`].
    ///
    /// # Errors
    ///
    /// As [`MultiRepository::commit`].
    pub async fn commit(&mut self) -> Result<bool, S::Error> {
        self.repository.commit().await
    }
}
