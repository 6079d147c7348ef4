//! Filter builder traits.
//!
//! A backend implements one builder per query dimension. Queries call the
//! primitive methods and combinators to describe a predicate; what a
//! `Filter` *is* (a BSON document, a SQL fragment, a boxed closure) is
//! entirely the backend's business.

use chrono::{DateTime, Utc};

use crate::pointer::{Id, Version};

/// Combinators shared by every filter builder dimension.
pub trait FilterCombinators {
    /// The backend's compiled predicate type.
    type Filter;

    /// A predicate matching rows that satisfy every given filter.
    fn all_of(&self, filters: Vec<Self::Filter>) -> Self::Filter;

    /// A predicate matching rows that satisfy any given filter.
    fn any_of(&self, filters: Vec<Self::Filter>) -> Self::Filter;

    /// A predicate matching rows the given filter rejects.
    fn not(&self, filter: Self::Filter) -> Self::Filter;
}

/// Predicates over committed sources.
pub trait SourceFilterBuilder: FilterCombinators {
    /// Sources whose id is in the given set.
    fn source_id_in(&self, ids: &[Id]) -> Self::Filter;

    /// Sources touching any of the given entities.
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter;

    /// Sources committed at or after the given instant.
    fn timestamp_gte(&self, timestamp: DateTime<Utc>) -> Self::Filter;

    /// Sources committed at or before the given instant.
    fn timestamp_lte(&self, timestamp: DateTime<Utc>) -> Self::Filter;

    /// Sources carrying at least one delta of any of the given kinds.
    fn delta_kind_in(&self, kinds: &[&str]) -> Self::Filter;
}

/// Predicates over committed messages.
pub trait MessageFilterBuilder: FilterCombinators {
    /// Messages belonging to any of the given entities.
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter;

    /// Messages whose post-apply version is at least the given version.
    fn version_gte(&self, version: Version) -> Self::Filter;

    /// Messages whose post-apply version is at most the given version.
    fn version_lte(&self, version: Version) -> Self::Filter;

    /// Messages committed by any of the given sources.
    fn source_id_in(&self, ids: &[Id]) -> Self::Filter;

    /// Messages committed at or after the given instant.
    fn timestamp_gte(&self, timestamp: DateTime<Utc>) -> Self::Filter;

    /// Messages committed at or before the given instant.
    fn timestamp_lte(&self, timestamp: DateTime<Utc>) -> Self::Filter;

    /// Messages carrying a delta of any of the given kinds.
    fn delta_kind_in(&self, kinds: &[&str]) -> Self::Filter;
}

/// Predicates over held leases.
pub trait LeaseFilterBuilder: FilterCombinators {
    /// Leases owned by any of the given entities.
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter;

    fn scope_eq(&self, scope: &str) -> Self::Filter;

    fn label_eq(&self, label: &str) -> Self::Filter;

    fn value_eq(&self, value: &str) -> Self::Filter;
}

/// Predicates over attached tags.
pub trait TagFilterBuilder: FilterCombinators {
    /// Tags owned by any of the given entities.
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter;

    fn label_eq(&self, label: &str) -> Self::Filter;

    fn value_eq(&self, value: &str) -> Self::Filter;
}
