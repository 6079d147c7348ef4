//! Optimistic concurrency control.
//!
//! Every commit runs each message of a source through the version check
//! implemented here, inside the backend's transaction: a single failing
//! message aborts the whole source, leaving no partial writes. At most one
//! successful commit can extend a given entity's version chain per version
//! number; losers reload and retry.

use std::collections::HashMap;

use nonempty::NonEmpty;
use thiserror::Error;

use crate::{
    pointer::{Id, Pointer, Version},
    source::{Source, VersionTarget},
};

/// A message failed its version check against the store.
///
/// This is expected contention, not an exceptional condition: repositories
/// surface it as `commit` returning `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error(
    "concurrency conflict: entity {entity_id} message targets version {attempted}, but the last \
     committed version is {actual} (hint: the entity advanced since it was loaded; reload and \
     retry)"
)]
pub struct ConcurrencyConflict {
    pub entity_id: Id,
    /// The post-apply version the message carried.
    pub attempted: Version,
    /// The entity's last committed version at check time.
    pub actual: Version,
}

/// A message targeted version zero, which is reserved for "does not exist".
///
/// This is a usage defect and is rejected before any write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("version 0 is reserved and can never be committed (entity {entity_id})")]
pub struct VersionZeroError {
    pub entity_id: Id,
}

/// Outcome of resolving a source's version checks.
#[derive(Debug)]
pub enum SourceResolution<D> {
    /// Every check passed. All message targets are now exact, and `pointers`
    /// lists the post-apply pointer of each message in source order.
    Accepted {
        source: Source<D>,
        pointers: Vec<Pointer>,
    },
    /// A message failed its check; nothing may be written.
    Conflicted(ConcurrencyConflict),
}

/// Resolve every message of a source against the store's last committed
/// versions.
///
/// `last_version` reports an entity's last committed version
/// ([`Version::ZERO`] when the entity has never been written). It is queried
/// at most once per entity; progression *within* the source is tracked here,
/// so a later message checks against the version an earlier message of the
/// same source produced.
///
/// Two modes per message (see [`VersionTarget`]):
///
/// - `Exact(v)`: the check fails unless the entity's current version is
///   exactly `v - 1`.
/// - `AtLatest`: the controller assigns the next version itself and the
///   check cannot fail.
///
/// Callers must invoke this inside the same transaction that performs the
/// writes.
///
/// # Errors
///
/// Returns [`VersionZeroError`] if a message targets the reserved version
/// zero; the source must be rejected before any write.
pub fn resolve_source<D>(
    source: Source<D>,
    mut last_version: impl FnMut(Id) -> Version,
) -> Result<SourceResolution<D>, VersionZeroError> {
    let Source {
        id,
        timestamp,
        agent_signature,
        messages,
    } = source;

    let message_count = messages.len();
    let mut heads: HashMap<Id, Version> = HashMap::new();
    let mut pointers = Vec::with_capacity(message_count);
    let mut resolved = Vec::with_capacity(message_count);

    for mut message in messages {
        let entity_id = message.entity_id;
        let head = *heads
            .entry(entity_id)
            .or_insert_with(|| last_version(entity_id));

        let assigned = match message.target {
            VersionTarget::Exact(version) => {
                if version == Version::ZERO {
                    return Err(VersionZeroError { entity_id });
                }
                if head.next() != version {
                    return Ok(SourceResolution::Conflicted(ConcurrencyConflict {
                        entity_id,
                        attempted: version,
                        actual: head,
                    }));
                }
                version
            }
            VersionTarget::AtLatest => head.next(),
        };

        message.target = VersionTarget::Exact(assigned);
        heads.insert(entity_id, assigned);
        pointers.push(Pointer::new(entity_id, assigned));
        resolved.push(message);
    }

    let messages = match NonEmpty::from_vec(resolved) {
        Some(messages) => messages,
        None => unreachable!("a source always carries at least one message"),
    };
    Ok(SourceResolution::Accepted {
        source: Source::new(id, timestamp, agent_signature, messages),
        pointers,
    })
}
