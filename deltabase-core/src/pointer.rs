//! Identity value types.
//!
//! [`Id`] is an opaque 128-bit random identifier used for both entities and
//! sources. [`Version`] is a position in an entity's delta stream, where zero
//! means "does not exist yet" and doubles as the "latest known" sentinel in
//! lookup contexts. [`Pointer`] addresses exact state as an `(Id, Version)`
//! pair.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque global identifier. Globally unique by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Mint a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Position in an entity's delta stream.
///
/// Increases by exactly one per applied delta. [`Version::ZERO`] means the
/// entity does not exist yet; it is reserved and never committed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The reserved "does not exist yet" version.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version produced by applying one more delta.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Whether this version denotes state that exists (is non-zero).
    #[must_use]
    pub const fn exists(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Exact addressable state: an entity id plus a version.
///
/// A pointer whose version is [`Version::ZERO`] denotes "latest known" in
/// lookup contexts (loads and snapshot slots).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub id: Id,
    pub version: Version,
}

impl Pointer {
    #[must_use]
    pub const fn new(id: Id, version: Version) -> Self {
        Self { id, version }
    }

    /// The "latest known" lookup pointer for an entity.
    #[must_use]
    pub const fn latest(id: Id) -> Self {
        Self {
            id,
            version: Version::ZERO,
        }
    }

    /// Whether this pointer requests the latest known state rather than an
    /// exact version.
    #[must_use]
    pub const fn is_latest_request(self) -> bool {
        !self.version.exists()
    }

    /// The pointer produced by applying one more delta.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            id: self.id,
            version: self.version.next(),
        }
    }

    /// Whether state at this pointer satisfies the given request: any
    /// existing state satisfies a latest request, otherwise the versions must
    /// match exactly.
    #[must_use]
    pub fn satisfies(self, requested: Self) -> bool {
        self.id == requested.id
            && if requested.is_latest_request() {
                self.version.exists()
            } else {
                self.version == requested.version
            }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_distinct() {
        assert_ne!(Id::random(), Id::random());
    }

    #[test]
    fn version_zero_does_not_exist() {
        assert!(!Version::ZERO.exists());
        assert!(Version::ZERO.next().exists());
    }

    #[test]
    fn version_next_increments_by_one() {
        assert_eq!(Version::new(5).next(), Version::new(6));
    }

    #[test]
    fn latest_pointer_is_a_latest_request() {
        let id = Id::random();
        assert!(Pointer::latest(id).is_latest_request());
        assert!(!Pointer::new(id, Version::new(1)).is_latest_request());
    }

    #[test]
    fn any_existing_version_satisfies_a_latest_request() {
        let id = Id::random();
        let latest = Pointer::latest(id);
        assert!(Pointer::new(id, Version::new(3)).satisfies(latest));
        assert!(!Pointer::latest(id).satisfies(latest));
    }

    #[test]
    fn exact_requests_require_an_exact_match() {
        let id = Id::random();
        let requested = Pointer::new(id, Version::new(2));
        assert!(Pointer::new(id, Version::new(2)).satisfies(requested));
        assert!(!Pointer::new(id, Version::new(3)).satisfies(requested));
        assert!(!Pointer::new(Id::random(), Version::new(2)).satisfies(requested));
    }

    #[test]
    fn pointer_displays_id_and_version() {
        let id = Id::random();
        let rendered = Pointer::new(id, Version::new(7)).to_string();
        assert!(rendered.ends_with("@7"));
        assert!(rendered.starts_with(&id.to_string()));
    }
}
