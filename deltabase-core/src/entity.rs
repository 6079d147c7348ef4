//! Entity contract and versioned state.
//!
//! An [`Entity`] defines pure construction and reduction rules; [`State`]
//! wraps the entity body together with its [`Pointer`] and bumps the version
//! structurally on every reduction, so the one-delta-one-version invariant is
//! enforced by the core rather than by convention.
//!
//! Replay is a strict left fold. The same fold runs whether state is rebuilt
//! from version zero or resumed from a cached snapshot; the two paths are
//! observably equivalent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    delta::Delta,
    pointer::{Id, Pointer, Version},
};

/// A domain aggregate whose state is derived from its delta history.
///
/// # Contract
///
/// - [`construct`](Entity::construct) is a pure function with no side
///   effects; the result is the state at version zero.
/// - [`can_reduce`](Entity::can_reduce) is a total, side-effect-free
///   predicate.
/// - [`reduce`](Entity::reduce) must not fail for any delta that
///   `can_reduce` accepted. Passing a delta that fails `can_reduce` is a
///   usage defect, not a recoverable condition; callers guard with
///   `can_reduce` first.
pub trait Entity: Sized {
    /// Identifies this entity type (e.g. `"account"`). Used by snapshot
    /// stores and processors to key derived state.
    const KIND: &'static str;

    /// The set of deltas this entity can reduce.
    type Delta: Delta;

    /// The entity body at version zero.
    fn construct(id: Id) -> Self;

    /// Whether `delta` can currently be reduced onto this body.
    fn can_reduce(&self, delta: &Self::Delta) -> bool;

    /// Apply one delta to produce the next body.
    fn reduce(self, delta: &Self::Delta) -> Self;
}

/// Replay hit a delta that the reconstructed state cannot reduce.
///
/// Committed history must always replay; this error indicates unusable
/// stored data, not a recoverable condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("stored delta at {pointer} cannot be reduced onto the replayed state")]
pub struct ReplayError {
    /// The pointer of the state the irreducible delta was applied to.
    pub pointer: Pointer,
}

/// An entity body bound to its current pointer.
///
/// Values are immutable: every reduction consumes the state and returns a new
/// one whose version is exactly one higher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State<E> {
    pointer: Pointer,
    body: E,
}

impl<E: Entity> State<E> {
    /// The state of a brand-new entity, at version zero.
    #[must_use]
    pub fn construct(id: Id) -> Self {
        Self {
            pointer: Pointer::new(id, Version::ZERO),
            body: E::construct(id),
        }
    }

    #[must_use]
    pub const fn pointer(&self) -> Pointer {
        self.pointer
    }

    #[must_use]
    pub const fn id(&self) -> Id {
        self.pointer.id
    }

    #[must_use]
    pub const fn version(&self) -> Version {
        self.pointer.version
    }

    #[must_use]
    pub const fn body(&self) -> &E {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> E {
        self.body
    }

    /// Whether `delta` can currently be reduced onto this state.
    #[must_use]
    pub fn can_reduce(&self, delta: &E::Delta) -> bool {
        self.body.can_reduce(delta)
    }

    /// Apply one delta, advancing the version by exactly one.
    ///
    /// Callers must check [`can_reduce`](State::can_reduce) first; see the
    /// [`Entity`] contract.
    #[must_use]
    pub fn reduce(self, delta: &E::Delta) -> Self {
        Self {
            pointer: self.pointer.next(),
            body: self.body.reduce(delta),
        }
    }

    /// Strict left fold over an ordered delta sequence.
    ///
    /// The final version equals the starting version plus the sequence
    /// length.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] if a delta fails `can_reduce` at the point it
    /// would be applied.
    pub fn replay<'a, I>(self, deltas: I) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = &'a E::Delta>,
        E::Delta: 'a,
    {
        let mut state = self;
        for delta in deltas {
            if !state.can_reduce(delta) {
                return Err(ReplayError {
                    pointer: state.pointer,
                });
            }
            state = state.reduce(delta);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{Ledger, LedgerDelta};

    #[test]
    fn construct_yields_version_zero() {
        let id = Id::random();
        let state = State::<Ledger>::construct(id);
        assert_eq!(state.pointer(), Pointer::new(id, Version::ZERO));
        assert_eq!(state.body().balance, 0);
    }

    #[test]
    fn reduce_advances_version_by_one() {
        let state = State::<Ledger>::construct(Id::random());
        let state = state.reduce(&LedgerDelta::Deposited { amount: 10 });
        assert_eq!(state.version(), Version::new(1));
        assert_eq!(state.body().balance, 10);
    }

    #[test]
    fn replay_version_equals_sequence_length() {
        let deltas = vec![
            LedgerDelta::Deposited { amount: 10 },
            LedgerDelta::Deposited { amount: 5 },
            LedgerDelta::Withdrawn { amount: 3 },
        ];
        let state = State::<Ledger>::construct(Id::random())
            .replay(&deltas)
            .expect("every delta is reducible");
        assert_eq!(state.version().get(), deltas.len() as u64);
        assert_eq!(state.body().balance, 12);
    }

    #[test]
    fn replay_rejects_irreducible_delta_at_application_point() {
        let deltas = vec![
            LedgerDelta::Deposited { amount: 1 },
            // Overdraws: can_reduce fails once the fold reaches it.
            LedgerDelta::Withdrawn { amount: 5 },
        ];
        let error = State::<Ledger>::construct(Id::random())
            .replay(&deltas)
            .expect_err("overdraw is irreducible");
        assert_eq!(error.pointer.version, Version::new(1));
    }

    #[test]
    fn resuming_from_intermediate_state_matches_full_replay() {
        let id = Id::random();
        let deltas = vec![
            LedgerDelta::Deposited { amount: 10 },
            LedgerDelta::Deposited { amount: 20 },
            LedgerDelta::Withdrawn { amount: 5 },
            LedgerDelta::Deposited { amount: 1 },
        ];

        let full = State::<Ledger>::construct(id)
            .replay(&deltas)
            .expect("reducible");

        let intermediate = State::<Ledger>::construct(id)
            .replay(&deltas[..2])
            .expect("reducible");
        let resumed = intermediate.replay(&deltas[2..]).expect("reducible");

        assert_eq!(full, resumed);
    }
}
