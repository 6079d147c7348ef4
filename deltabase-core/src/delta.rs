//! Delta contract.
//!
//! A delta is an opaque domain operation that advances an entity by exactly
//! one version. Beyond reduction, a delta may declare *effects* on the
//! store's secondary structures: leases it claims or releases and tags it
//! adds or removes. Effects are plain accessors with empty defaults, resolved
//! once when the delta is staged; there is no runtime type probing in the
//! reduction path.

use crate::source::{Lease, Tag};

/// An opaque domain operation.
///
/// Implementations are usually enums with one variant per operation. The
/// [`kind`](Delta::kind) discriminator is what query filters match on, so it
/// must be stable across releases.
pub trait Delta {
    /// Stable discriminator for this delta. Use lowercase, kebab-case for
    /// consistency: `"deposited"`, `"holder-named"`, etc.
    fn kind(&self) -> &'static str;

    /// Leases this delta claims. Enforced globally unique at commit time.
    fn add_leases(&self) -> Vec<Lease> {
        Vec::new()
    }

    /// Leases this delta releases.
    fn delete_leases(&self) -> Vec<Lease> {
        Vec::new()
    }

    /// Tags this delta attaches to the resulting state version.
    fn add_tags(&self) -> Vec<Tag> {
        Vec::new()
    }

    /// Tags this delta removes from the entity.
    fn delete_tags(&self) -> Vec<Tag> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Delta for Noop {
        fn kind(&self) -> &'static str {
            "noop"
        }
    }

    #[test]
    fn effects_default_to_empty() {
        let delta = Noop;
        assert!(delta.add_leases().is_empty());
        assert!(delta.delete_leases().is_empty());
        assert!(delta.add_tags().is_empty());
        assert!(delta.delete_tags().is_empty());
    }
}
