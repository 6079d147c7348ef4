//! Query composition wrappers.
//!
//! [`QueryModifier`] is an explicit value describing overrides;
//! [`ModifiedQuery`] applies it on top of any query. Neither knows the
//! query's backend: filter inversion goes through the builder's `not`
//! combinator and sort reversal through the [`Reverse`] wrapper.

use super::{
    LeaseFilterBuilder, LeaseQuery, LeaseSortBuilder, MessageFilterBuilder, MessageQuery,
    MessageSortBuilder, Reverse, SourceFilterBuilder, SourceQuery, SourceSortBuilder,
    TagFilterBuilder, TagQuery, TagSortBuilder,
};

/// Overrides composed onto an existing query.
///
/// Each builder method returns a new value; there is no shared backing
/// state. Skip/take replacement distinguishes "keep the inner query's value"
/// (not called) from "replace with no limit" (called with `None`).
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryModifier {
    invert_filter: bool,
    reverse_sort: bool,
    skip: Option<Option<u64>>,
    take: Option<Option<u64>>,
}

impl QueryModifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match exactly the rows the inner query rejects.
    #[must_use]
    pub const fn invert_filter(mut self) -> Self {
        self.invert_filter = true;
        self
    }

    /// Invert every ascending flag of the inner query's sort.
    #[must_use]
    pub const fn reverse_sort(mut self) -> Self {
        self.reverse_sort = true;
        self
    }

    /// Replace the inner query's skip.
    #[must_use]
    pub const fn skip(mut self, skip: Option<u64>) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Replace the inner query's take.
    #[must_use]
    pub const fn take(mut self, take: Option<u64>) -> Self {
        self.take = Some(take);
        self
    }
}

/// An existing query with a [`QueryModifier`] applied.
#[derive(Clone, Copy, Debug)]
pub struct ModifiedQuery<Q> {
    inner: Q,
    modifier: QueryModifier,
}

impl<Q> ModifiedQuery<Q> {
    #[must_use]
    pub const fn new(inner: Q, modifier: QueryModifier) -> Self {
        Self { inner, modifier }
    }

    #[must_use]
    pub fn into_inner(self) -> Q {
        self.inner
    }
}

macro_rules! impl_modified_query {
    ($query:ident, $filter_builder:ident, $sort_builder:ident) => {
        impl<Q: $query> $query for ModifiedQuery<Q> {
            fn get_filter<B: $filter_builder>(&self, builder: &B) -> B::Filter {
                let filter = self.inner.get_filter(builder);
                if self.modifier.invert_filter {
                    builder.not(filter)
                } else {
                    filter
                }
            }

            fn get_sort<B: $sort_builder>(&self, builder: &B) -> Option<B::Sort> {
                if self.modifier.reverse_sort {
                    self.inner.get_sort(&Reverse(builder))
                } else {
                    self.inner.get_sort(builder)
                }
            }

            fn skip(&self) -> Option<u64> {
                self.modifier.skip.unwrap_or_else(|| self.inner.skip())
            }

            fn take(&self) -> Option<u64> {
                self.modifier.take.unwrap_or_else(|| self.inner.take())
            }
        }
    };
}

impl_modified_query!(SourceQuery, SourceFilterBuilder, SourceSortBuilder);
impl_modified_query!(MessageQuery, MessageFilterBuilder, MessageSortBuilder);
impl_modified_query!(LeaseQuery, LeaseFilterBuilder, LeaseSortBuilder);
impl_modified_query!(TagQuery, TagFilterBuilder, TagSortBuilder);
