//! Source repository boundary.
//!
//! The durable append-only log. Concrete adapters (document, relational,
//! in-memory) implement [`SourceRepository`]; the core only speaks this
//! trait. Enumerations are lazy streams, restartable per call but not
//! resumable mid-stream, and a store must provide read-your-writes
//! consistency for the session that just committed.

use std::{future::Future, pin::Pin};

use futures_core::Stream;

use crate::{
    pointer::{Id, Pointer},
    query::{LeaseQuery, MessageQuery, SourceQuery, TagQuery},
    source::{Lease, Source, Tag},
};

pub mod inmemory;

/// Lazy enumeration yielded by repository queries.
pub type Enumeration<'a, T, E> = Pin<Box<dyn Stream<Item = Result<T, E>> + Send + 'a>>;

/// The durable append-only log of sources.
///
/// `commit` is the only write path. It returns `Ok(false)` for contention
/// (an optimistic-concurrency mismatch or a lease-uniqueness conflict) and
/// reserves the error channel for usage defects and storage failures.
/// Whatever the outcome, a commit is all-or-nothing: a single failing
/// message leaves no partial writes.
pub trait SourceRepository<D>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Atomically commit a source.
    ///
    /// # Errors
    ///
    /// Returns an error for version-zero targets, read-only sessions, and
    /// storage failures; ordinary contention is `Ok(false)`.
    fn commit(&self, source: Source<D>) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Fetch one committed source by id, for replay pipelines.
    ///
    /// # Errors
    ///
    /// Returns a store-specific error when the lookup fails.
    fn fetch_source<'a>(
        &'a self,
        id: Id,
    ) -> impl Future<Output = Result<Option<Source<D>>, Self::Error>> + Send + 'a;

    /// Ids of committed sources matching the query.
    fn enumerate_source_ids<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, Id, Self::Error>
    where
        Q: SourceQuery + Sync;

    /// Post-apply state pointers of committed messages matching the query.
    fn enumerate_state_pointers<'a, Q>(
        &'a self,
        query: &'a Q,
    ) -> Enumeration<'a, Pointer, Self::Error>
    where
        Q: MessageQuery + Sync;

    /// Deltas of committed messages matching the query.
    fn enumerate_deltas<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, D, Self::Error>
    where
        Q: MessageQuery + Sync;

    /// Currently held leases matching the query.
    fn enumerate_leases<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, Lease, Self::Error>
    where
        Q: LeaseQuery + Sync;

    /// Currently attached tags matching the query.
    fn enumerate_tags<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, Tag, Self::Error>
    where
        Q: TagQuery + Sync;
}
