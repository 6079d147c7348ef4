//! Backend-neutral query abstraction.
//!
//! A query never encodes backend syntax. Instead it describes its predicate
//! and ordering against a *builder* supplied by the backend: the store hands
//! the query its own filter/sort builder, and the query calls primitive and
//! combinator methods on it. The same query value therefore runs unmodified
//! against any store that implements the builder traits, including the
//! in-memory reference backend used in tests.
//!
//! [`ModifiedQuery`] composes overrides (inverted filter, reversed sort,
//! replaced skip/take) onto an existing query without knowing its concrete
//! type or backend.

pub mod filter;
mod modified;
pub mod sort;

pub use filter::{
    FilterCombinators, LeaseFilterBuilder, MessageFilterBuilder, SourceFilterBuilder,
    TagFilterBuilder,
};
pub use modified::{ModifiedQuery, QueryModifier};
pub use sort::{
    LeaseSortBuilder, MessageSortBuilder, Reverse, SortCombinators, SourceSortBuilder,
    TagSortBuilder,
};

/// A declarative query over committed sources.
pub trait SourceQuery {
    /// Describe this query's predicate against the given builder.
    fn get_filter<B: SourceFilterBuilder>(&self, builder: &B) -> B::Filter;

    /// Describe this query's ordering. `None` means backend order (commit
    /// order for stores that have one).
    fn get_sort<B: SourceSortBuilder>(&self, builder: &B) -> Option<B::Sort> {
        let _ = builder;
        None
    }

    /// Number of leading results to drop.
    fn skip(&self) -> Option<u64> {
        None
    }

    /// Maximum number of results to yield.
    fn take(&self) -> Option<u64> {
        None
    }
}

/// A declarative query over committed messages.
pub trait MessageQuery {
    fn get_filter<B: MessageFilterBuilder>(&self, builder: &B) -> B::Filter;

    fn get_sort<B: MessageSortBuilder>(&self, builder: &B) -> Option<B::Sort> {
        let _ = builder;
        None
    }

    fn skip(&self) -> Option<u64> {
        None
    }

    fn take(&self) -> Option<u64> {
        None
    }
}

/// A declarative query over held leases.
pub trait LeaseQuery {
    fn get_filter<B: LeaseFilterBuilder>(&self, builder: &B) -> B::Filter;

    fn get_sort<B: LeaseSortBuilder>(&self, builder: &B) -> Option<B::Sort> {
        let _ = builder;
        None
    }

    fn skip(&self) -> Option<u64> {
        None
    }

    fn take(&self) -> Option<u64> {
        None
    }
}

/// A declarative query over attached tags.
pub trait TagQuery {
    fn get_filter<B: TagFilterBuilder>(&self, builder: &B) -> B::Filter;

    fn get_sort<B: TagSortBuilder>(&self, builder: &B) -> Option<B::Sort> {
        let _ = builder;
        None
    }

    fn skip(&self) -> Option<u64> {
        None
    }

    fn take(&self) -> Option<u64> {
        None
    }
}
