//! The immutable unit of change and the immutable unit of atomic commit.
//!
//! A [`Message`] binds one delta to the state transition it produced, along
//! with the lease/tag effects resolved from the delta. A [`Source`] is an
//! ordered, non-empty batch of messages committed atomically, stamped with
//! provenance from the [`Agent`](crate::agent::Agent).

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::{
    delta::Delta,
    pointer::{Id, Pointer, Version},
};

/// A globally unique claim: `(scope, label, value)`.
///
/// Uniqueness is enforced across the entire store, not per entity. Committing
/// a source that claims an already-held lease is rejected as contention.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lease {
    pub scope: String,
    pub label: String,
    pub value: String,
}

impl Lease {
    #[must_use]
    pub fn new(
        scope: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            scope: scope.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A queryable, non-unique annotation bound to a state version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub value: String,
}

impl Tag {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Optimistic-concurrency directive carried by each message.
///
/// This is the Rust rendition of the original version-zero sentinel: instead
/// of overloading a reserved version number, the two commit modes are
/// distinct variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionTarget {
    /// Commit exactly this post-apply version. The whole source fails if the
    /// entity's last committed version is not exactly one below it.
    Exact(Version),
    /// Append at the entity's latest version; the concurrency controller
    /// assigns the post-apply version at commit time.
    AtLatest,
}

/// One delta bound to one state transition.
#[derive(Clone, Debug)]
pub struct Message<D> {
    /// The entity this delta applies to.
    pub entity_id: Id,
    /// The post-apply version, or the append-at-latest directive.
    pub target: VersionTarget,
    /// The domain operation.
    pub delta: D,
    pub add_leases: Vec<Lease>,
    pub delete_leases: Vec<Lease>,
    pub add_tags: Vec<Tag>,
    pub delete_tags: Vec<Tag>,
}

impl<D: Delta> Message<D> {
    /// Bind a delta to the exact state transition it produced, resolving the
    /// delta's lease/tag effects once.
    ///
    /// `state_pointer` is the pointer *after* applying the delta.
    #[must_use]
    pub fn bind(state_pointer: Pointer, delta: D) -> Self {
        Self {
            entity_id: state_pointer.id,
            target: VersionTarget::Exact(state_pointer.version),
            add_leases: delta.add_leases(),
            delete_leases: delta.delete_leases(),
            add_tags: delta.add_tags(),
            delete_tags: delta.delete_tags(),
            delta,
        }
    }

    /// Bind a delta to be appended at the entity's latest version, letting
    /// the concurrency controller assign the post-apply version.
    #[must_use]
    pub fn bind_at_latest(entity_id: Id, delta: D) -> Self {
        Self {
            entity_id,
            target: VersionTarget::AtLatest,
            add_leases: delta.add_leases(),
            delete_leases: delta.delete_leases(),
            add_tags: delta.add_tags(),
            delete_tags: delta.delete_tags(),
            delta,
        }
    }
}

impl<D> Message<D> {
    /// The post-apply state pointer, when the target version is known.
    ///
    /// Returns `None` for unresolved append-at-latest messages; every message
    /// in a *committed* source has an exact target.
    #[must_use]
    pub const fn state_pointer(&self) -> Option<Pointer> {
        match self.target {
            VersionTarget::Exact(version) => Some(Pointer::new(self.entity_id, version)),
            VersionTarget::AtLatest => None,
        }
    }
}

/// An atomically committed batch of messages plus provenance.
///
/// Messages are applied in array order and may span multiple entity ids; all
/// of them commit together or none do.
#[derive(Clone, Debug)]
pub struct Source<D> {
    pub id: Id,
    pub timestamp: DateTime<Utc>,
    pub agent_signature: serde_json::Value,
    pub messages: NonEmpty<Message<D>>,
}

impl<D> Source<D> {
    #[must_use]
    pub const fn new(
        id: Id,
        timestamp: DateTime<Utc>,
        agent_signature: serde_json::Value,
        messages: NonEmpty<Message<D>>,
    ) -> Self {
        Self {
            id,
            timestamp,
            agent_signature,
            messages,
        }
    }

    /// Distinct entity ids touched by this source, in first-appearance order.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<Id> {
        let mut ids = Vec::new();
        for message in self.messages.iter() {
            if !ids.contains(&message.entity_id) {
                ids.push(message.entity_id);
            }
        }
        ids
    }

    /// The messages for one entity, in source order.
    pub fn messages_for(&self, entity_id: Id) -> impl Iterator<Item = &Message<D>> {
        self.messages
            .iter()
            .filter(move |message| message.entity_id == entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::LedgerDelta;

    fn message(entity_id: Id, version: u64) -> Message<LedgerDelta> {
        Message::bind(
            Pointer::new(entity_id, Version::new(version)),
            LedgerDelta::Deposited { amount: 1 },
        )
    }

    #[test]
    fn bind_resolves_effects_once() {
        let id = Id::random();
        let message = Message::bind(
            Pointer::new(id, Version::new(1)),
            LedgerDelta::HolderNamed {
                name: "alice".to_string(),
            },
        );
        assert_eq!(
            message.add_leases,
            vec![Lease::new("holder-name", "name", "alice")]
        );
        assert!(message.delete_leases.is_empty());
        assert_eq!(
            message.state_pointer(),
            Some(Pointer::new(id, Version::new(1)))
        );
    }

    #[test]
    fn bind_at_latest_has_no_state_pointer() {
        let message =
            Message::bind_at_latest(Id::random(), LedgerDelta::Deposited { amount: 1 });
        assert_eq!(message.state_pointer(), None);
        assert_eq!(message.target, VersionTarget::AtLatest);
    }

    #[test]
    fn entity_ids_are_distinct_and_ordered() {
        let (a, b) = (Id::random(), Id::random());
        let source = Source::new(
            Id::random(),
            Utc::now(),
            serde_json::Value::Null,
            NonEmpty::from_vec(vec![message(a, 1), message(b, 1), message(a, 2)])
                .expect("non-empty"),
        );
        assert_eq!(source.entity_ids(), vec![a, b]);
        assert_eq!(source.messages_for(a).count(), 2);
        assert_eq!(source.messages_for(b).count(), 1);
    }
}
