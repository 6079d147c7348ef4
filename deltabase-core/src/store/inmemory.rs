//! In-memory source repository for testing and embedded use.
//!
//! This is the reference implementation of [`SourceRepository`]: a
//! thread-safe store behind `Arc<RwLock<…>>` that keeps committed sources in
//! commit order and compiles the query abstraction into boxed row predicates
//! and sort-key programs. Version checks, lease uniqueness, and the writes
//! themselves all happen under one write lock, so a commit is atomic by
//! construction.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    concurrency::{SourceResolution, VersionZeroError, resolve_source},
    delta::Delta,
    pointer::{Id, Pointer, Version},
    query::{
        FilterCombinators, LeaseFilterBuilder, LeaseQuery, LeaseSortBuilder, MessageFilterBuilder,
        MessageQuery, MessageSortBuilder, SortCombinators, SourceFilterBuilder, SourceQuery,
        SourceSortBuilder, TagFilterBuilder, TagQuery, TagSortBuilder,
    },
    source::{Lease, Source, Tag},
    store::{Enumeration, SourceRepository},
};

/// Error type for the in-memory store.
#[derive(Debug, Error)]
pub enum InMemoryError {
    /// A write was attempted through a read-only handle.
    #[error("write attempted through a read-only session")]
    ReadOnly,
    #[error(transparent)]
    VersionZero(#[from] VersionZeroError),
}

/// Row visible to compiled source predicates.
#[derive(Clone, Debug)]
pub struct SourceRow {
    pub id: Id,
    pub timestamp: DateTime<Utc>,
    pub entity_ids: Vec<Id>,
    pub delta_kinds: Vec<&'static str>,
}

/// Row visible to compiled message predicates.
#[derive(Clone, Copy, Debug)]
pub struct MessageRow {
    pub source_id: Id,
    pub timestamp: DateTime<Utc>,
    pub pointer: Pointer,
    pub delta_kind: &'static str,
}

/// Row visible to compiled lease predicates.
#[derive(Clone, Debug)]
pub struct LeaseRow {
    pub lease: Lease,
    pub pointer: Pointer,
}

/// Row visible to compiled tag predicates.
#[derive(Clone, Debug)]
pub struct TagRow {
    pub tag: Tag,
    pub pointer: Pointer,
}

/// A compiled predicate over rows of one dimension.
pub struct MemoryFilter<Row>(Box<dyn Fn(&Row) -> bool + Send + Sync>);

impl<Row> MemoryFilter<Row> {
    fn new(predicate: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Self(Box::new(predicate))
    }

    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        (self.0)(row)
    }
}

impl<Row> fmt::Debug for MemoryFilter<Row> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MemoryFilter(..)")
    }
}

/// A compiled sort program: keys in priority order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemorySort<K>(pub Vec<K>);

trait SortRule<Row> {
    fn compare(&self, a: &Row, b: &Row) -> Ordering;
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}

/// Sort keys over [`SourceRow`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceSortKey {
    SourceId { ascending: bool },
    Timestamp { ascending: bool },
}

impl SortRule<SourceRow> for SourceSortKey {
    fn compare(&self, a: &SourceRow, b: &SourceRow) -> Ordering {
        match *self {
            Self::SourceId { ascending } => directed(a.id.cmp(&b.id), ascending),
            Self::Timestamp { ascending } => directed(a.timestamp.cmp(&b.timestamp), ascending),
        }
    }
}

/// Sort keys over [`MessageRow`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageSortKey {
    EntityId { ascending: bool },
    EntityVersion { ascending: bool },
    Timestamp { ascending: bool },
}

impl SortRule<MessageRow> for MessageSortKey {
    fn compare(&self, a: &MessageRow, b: &MessageRow) -> Ordering {
        match *self {
            Self::EntityId { ascending } => directed(a.pointer.id.cmp(&b.pointer.id), ascending),
            Self::EntityVersion { ascending } => {
                directed(a.pointer.version.cmp(&b.pointer.version), ascending)
            }
            Self::Timestamp { ascending } => directed(a.timestamp.cmp(&b.timestamp), ascending),
        }
    }
}

/// Sort keys over [`LeaseRow`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseSortKey {
    EntityId { ascending: bool },
    Scope { ascending: bool },
    Label { ascending: bool },
    Value { ascending: bool },
}

impl SortRule<LeaseRow> for LeaseSortKey {
    fn compare(&self, a: &LeaseRow, b: &LeaseRow) -> Ordering {
        match *self {
            Self::EntityId { ascending } => directed(a.pointer.id.cmp(&b.pointer.id), ascending),
            Self::Scope { ascending } => directed(a.lease.scope.cmp(&b.lease.scope), ascending),
            Self::Label { ascending } => directed(a.lease.label.cmp(&b.lease.label), ascending),
            Self::Value { ascending } => directed(a.lease.value.cmp(&b.lease.value), ascending),
        }
    }
}

/// Sort keys over [`TagRow`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagSortKey {
    EntityId { ascending: bool },
    Label { ascending: bool },
    Value { ascending: bool },
}

impl SortRule<TagRow> for TagSortKey {
    fn compare(&self, a: &TagRow, b: &TagRow) -> Ordering {
        match *self {
            Self::EntityId { ascending } => directed(a.pointer.id.cmp(&b.pointer.id), ascending),
            Self::Label { ascending } => directed(a.tag.label.cmp(&b.tag.label), ascending),
            Self::Value { ascending } => directed(a.tag.value.cmp(&b.tag.value), ascending),
        }
    }
}

/// Builder compiling source queries into in-memory predicates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemorySourceBuilder;

/// Builder compiling message queries into in-memory predicates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryMessageBuilder;

/// Builder compiling lease queries into in-memory predicates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryLeaseBuilder;

/// Builder compiling tag queries into in-memory predicates.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryTagBuilder;

macro_rules! impl_memory_combinators {
    ($builder:ty, $row:ty, $key:ty) => {
        impl FilterCombinators for $builder {
            type Filter = MemoryFilter<$row>;

            fn all_of(&self, filters: Vec<Self::Filter>) -> Self::Filter {
                MemoryFilter::new(move |row| filters.iter().all(|filter| filter.matches(row)))
            }

            fn any_of(&self, filters: Vec<Self::Filter>) -> Self::Filter {
                MemoryFilter::new(move |row| filters.iter().any(|filter| filter.matches(row)))
            }

            fn not(&self, filter: Self::Filter) -> Self::Filter {
                MemoryFilter::new(move |row| !filter.matches(row))
            }
        }

        impl SortCombinators for $builder {
            type Sort = MemorySort<$key>;

            fn combine(&self, sorts: Vec<Self::Sort>) -> Self::Sort {
                MemorySort(sorts.into_iter().flat_map(|sort| sort.0).collect())
            }
        }
    };
}

impl_memory_combinators!(MemorySourceBuilder, SourceRow, SourceSortKey);
impl_memory_combinators!(MemoryMessageBuilder, MessageRow, MessageSortKey);
impl_memory_combinators!(MemoryLeaseBuilder, LeaseRow, LeaseSortKey);
impl_memory_combinators!(MemoryTagBuilder, TagRow, TagSortKey);

impl SourceFilterBuilder for MemorySourceBuilder {
    fn source_id_in(&self, ids: &[Id]) -> Self::Filter {
        let ids = ids.to_vec();
        MemoryFilter::new(move |row: &SourceRow| ids.contains(&row.id))
    }

    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter {
        let ids = ids.to_vec();
        MemoryFilter::new(move |row: &SourceRow| {
            row.entity_ids.iter().any(|id| ids.contains(id))
        })
    }

    fn timestamp_gte(&self, timestamp: DateTime<Utc>) -> Self::Filter {
        MemoryFilter::new(move |row: &SourceRow| row.timestamp >= timestamp)
    }

    fn timestamp_lte(&self, timestamp: DateTime<Utc>) -> Self::Filter {
        MemoryFilter::new(move |row: &SourceRow| row.timestamp <= timestamp)
    }

    fn delta_kind_in(&self, kinds: &[&str]) -> Self::Filter {
        let kinds: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        MemoryFilter::new(move |row: &SourceRow| {
            row.delta_kinds.iter().any(|kind| kinds.iter().any(|k| k == kind))
        })
    }
}

impl SourceSortBuilder for MemorySourceBuilder {
    fn source_id(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![SourceSortKey::SourceId { ascending }])
    }

    fn timestamp(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![SourceSortKey::Timestamp { ascending }])
    }
}

impl MessageFilterBuilder for MemoryMessageBuilder {
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter {
        let ids = ids.to_vec();
        MemoryFilter::new(move |row: &MessageRow| ids.contains(&row.pointer.id))
    }

    fn version_gte(&self, version: Version) -> Self::Filter {
        MemoryFilter::new(move |row: &MessageRow| row.pointer.version >= version)
    }

    fn version_lte(&self, version: Version) -> Self::Filter {
        MemoryFilter::new(move |row: &MessageRow| row.pointer.version <= version)
    }

    fn source_id_in(&self, ids: &[Id]) -> Self::Filter {
        let ids = ids.to_vec();
        MemoryFilter::new(move |row: &MessageRow| ids.contains(&row.source_id))
    }

    fn timestamp_gte(&self, timestamp: DateTime<Utc>) -> Self::Filter {
        MemoryFilter::new(move |row: &MessageRow| row.timestamp >= timestamp)
    }

    fn timestamp_lte(&self, timestamp: DateTime<Utc>) -> Self::Filter {
        MemoryFilter::new(move |row: &MessageRow| row.timestamp <= timestamp)
    }

    fn delta_kind_in(&self, kinds: &[&str]) -> Self::Filter {
        let kinds: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        MemoryFilter::new(move |row: &MessageRow| kinds.iter().any(|k| k == row.delta_kind))
    }
}

impl MessageSortBuilder for MemoryMessageBuilder {
    fn entity_id(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![MessageSortKey::EntityId { ascending }])
    }

    fn entity_version(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![MessageSortKey::EntityVersion { ascending }])
    }

    fn timestamp(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![MessageSortKey::Timestamp { ascending }])
    }
}

impl LeaseFilterBuilder for MemoryLeaseBuilder {
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter {
        let ids = ids.to_vec();
        MemoryFilter::new(move |row: &LeaseRow| ids.contains(&row.pointer.id))
    }

    fn scope_eq(&self, scope: &str) -> Self::Filter {
        let scope = scope.to_string();
        MemoryFilter::new(move |row: &LeaseRow| row.lease.scope == scope)
    }

    fn label_eq(&self, label: &str) -> Self::Filter {
        let label = label.to_string();
        MemoryFilter::new(move |row: &LeaseRow| row.lease.label == label)
    }

    fn value_eq(&self, value: &str) -> Self::Filter {
        let value = value.to_string();
        MemoryFilter::new(move |row: &LeaseRow| row.lease.value == value)
    }
}

impl LeaseSortBuilder for MemoryLeaseBuilder {
    fn entity_id(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![LeaseSortKey::EntityId { ascending }])
    }

    fn scope(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![LeaseSortKey::Scope { ascending }])
    }

    fn label(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![LeaseSortKey::Label { ascending }])
    }

    fn value(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![LeaseSortKey::Value { ascending }])
    }
}

impl TagFilterBuilder for MemoryTagBuilder {
    fn entity_id_in(&self, ids: &[Id]) -> Self::Filter {
        let ids = ids.to_vec();
        MemoryFilter::new(move |row: &TagRow| ids.contains(&row.pointer.id))
    }

    fn label_eq(&self, label: &str) -> Self::Filter {
        let label = label.to_string();
        MemoryFilter::new(move |row: &TagRow| row.tag.label == label)
    }

    fn value_eq(&self, value: &str) -> Self::Filter {
        let value = value.to_string();
        MemoryFilter::new(move |row: &TagRow| row.tag.value == value)
    }
}

impl TagSortBuilder for MemoryTagBuilder {
    fn entity_id(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![TagSortKey::EntityId { ascending }])
    }

    fn label(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![TagSortKey::Label { ascending }])
    }

    fn value(&self, ascending: bool) -> Self::Sort {
        MemorySort(vec![TagSortKey::Value { ascending }])
    }
}

/// Filter, sort, and paginate projected rows. `Vec::sort_by` is stable, so
/// ties keep commit order.
fn evaluate<Row, Out, K>(
    mut rows: Vec<(Row, Out)>,
    filter: &MemoryFilter<Row>,
    sort: Option<MemorySort<K>>,
    skip: Option<u64>,
    take: Option<u64>,
) -> Vec<Out>
where
    K: SortRule<Row>,
{
    rows.retain(|(row, _)| filter.matches(row));
    if let Some(sort) = sort {
        rows.sort_by(|(a, _), (b, _)| {
            sort.0
                .iter()
                .map(|key| key.compare(a, b))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
    let skip = skip.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
    let take = take.map_or(usize::MAX, |t| usize::try_from(t).unwrap_or(usize::MAX));
    rows.into_iter()
        .skip(skip)
        .take(take)
        .map(|(_, out)| out)
        .collect()
}

struct MessageRecord<D> {
    source_id: Id,
    timestamp: DateTime<Utc>,
    pointer: Pointer,
    delta_kind: &'static str,
    delta: D,
}

impl<D> MessageRecord<D> {
    fn row(&self) -> MessageRow {
        MessageRow {
            source_id: self.source_id,
            timestamp: self.timestamp,
            pointer: self.pointer,
            delta_kind: self.delta_kind,
        }
    }
}

struct Inner<D> {
    sources: Vec<Source<D>>,
    messages: Vec<MessageRecord<D>>,
    versions: HashMap<Id, Version>,
    leases: HashMap<Lease, Pointer>,
    tags: Vec<TagRow>,
}

/// In-memory source repository.
///
/// Handles are cheap clones over shared state. [`Store::read_only`] derives a
/// handle whose `commit` fails with [`InMemoryError::ReadOnly`].
pub struct Store<D> {
    inner: Arc<RwLock<Inner<D>>>,
    read_only: bool,
}

impl<D> Clone for Store<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            read_only: self.read_only,
        }
    }
}

impl<D> fmt::Debug for Store<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl<D> Store<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                sources: Vec::new(),
                messages: Vec::new(),
                versions: HashMap::new(),
                leases: HashMap::new(),
                tags: Vec::new(),
            })),
            read_only: false,
        }
    }

    /// A handle over the same state that rejects all writes.
    #[must_use]
    pub fn read_only(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            read_only: true,
        }
    }
}

impl<D> Default for Store<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Store<D>
where
    D: Delta + Clone + Send + Sync + 'static,
{
    fn commit_sync(&self, source: Source<D>) -> Result<bool, InMemoryError> {
        if self.read_only {
            return Err(InMemoryError::ReadOnly);
        }
        let mut inner = self.inner.write().expect("in-memory store lock poisoned");
        let inner = &mut *inner;

        let resolution = resolve_source(source, |id| {
            inner.versions.get(&id).copied().unwrap_or(Version::ZERO)
        })?;
        let (source, pointers) = match resolution {
            SourceResolution::Accepted { source, pointers } => (source, pointers),
            SourceResolution::Conflicted(conflict) => {
                tracing::warn!(%conflict, "source rejected by version check");
                return Ok(false);
            }
        };

        // Lease uniqueness, order-aware within the source: a message's
        // deletes apply before its adds.
        {
            let mut added: HashSet<&Lease> = HashSet::new();
            let mut deleted: HashSet<&Lease> = HashSet::new();
            for message in source.messages.iter() {
                for lease in &message.delete_leases {
                    added.remove(lease);
                    deleted.insert(lease);
                }
                for lease in &message.add_leases {
                    let held = inner.leases.contains_key(lease) && !deleted.contains(lease);
                    if held || !added.insert(lease) {
                        tracing::warn!(
                            scope = %lease.scope,
                            label = %lease.label,
                            value = %lease.value,
                            "source rejected: lease already held"
                        );
                        return Ok(false);
                    }
                }
            }
        }

        // Every check passed; the writes below happen together under the
        // same lock, so readers never observe a partial source.
        for (pointer, message) in pointers.iter().zip(source.messages.iter()) {
            inner.messages.push(MessageRecord {
                source_id: source.id,
                timestamp: source.timestamp,
                pointer: *pointer,
                delta_kind: message.delta.kind(),
                delta: message.delta.clone(),
            });
            inner.versions.insert(pointer.id, pointer.version);
            for lease in &message.delete_leases {
                inner.leases.remove(lease);
            }
            for lease in &message.add_leases {
                inner.leases.insert(lease.clone(), *pointer);
            }
            for tag in &message.delete_tags {
                inner
                    .tags
                    .retain(|row| !(row.tag == *tag && row.pointer.id == pointer.id));
            }
            for tag in &message.add_tags {
                inner.tags.push(TagRow {
                    tag: tag.clone(),
                    pointer: *pointer,
                });
            }
        }
        tracing::debug!(
            source_id = %source.id,
            message_count = source.messages.len(),
            "source committed"
        );
        inner.sources.push(source);
        Ok(true)
    }

    fn message_rows<Out>(&self, project: impl Fn(&MessageRecord<D>) -> Out) -> Vec<(MessageRow, Out)> {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        inner
            .messages
            .iter()
            .map(|record| (record.row(), project(record)))
            .collect()
    }
}

impl<D> SourceRepository<D> for Store<D>
where
    D: Delta + Clone + Send + Sync + 'static,
{
    type Error = InMemoryError;

    #[tracing::instrument(skip(self, source), fields(message_count = source.messages.len()))]
    fn commit(
        &self,
        source: Source<D>,
    ) -> impl std::future::Future<Output = Result<bool, Self::Error>> + Send {
        std::future::ready(self.commit_sync(source))
    }

    fn fetch_source<'a>(
        &'a self,
        id: Id,
    ) -> impl std::future::Future<Output = Result<Option<Source<D>>, Self::Error>> + Send + 'a
    {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        let source = inner.sources.iter().find(|source| source.id == id).cloned();
        std::future::ready(Ok(source))
    }

    #[tracing::instrument(skip(self, query))]
    fn enumerate_source_ids<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, Id, Self::Error>
    where
        Q: SourceQuery + Sync,
    {
        let builder = MemorySourceBuilder;
        let filter = query.get_filter(&builder);
        let sort = query.get_sort(&builder);
        let rows: Vec<(SourceRow, Id)> = {
            let inner = self.inner.read().expect("in-memory store lock poisoned");
            inner
                .sources
                .iter()
                .map(|source| {
                    let row = SourceRow {
                        id: source.id,
                        timestamp: source.timestamp,
                        entity_ids: source.entity_ids(),
                        delta_kinds: source
                            .messages
                            .iter()
                            .map(|message| message.delta.kind())
                            .collect(),
                    };
                    (row, source.id)
                })
                .collect()
        };
        let ids = evaluate(rows, &filter, sort, query.skip(), query.take());
        Box::pin(tokio_stream::iter(ids.into_iter().map(Ok)))
    }

    #[tracing::instrument(skip(self, query))]
    fn enumerate_state_pointers<'a, Q>(
        &'a self,
        query: &'a Q,
    ) -> Enumeration<'a, Pointer, Self::Error>
    where
        Q: MessageQuery + Sync,
    {
        let builder = MemoryMessageBuilder;
        let filter = query.get_filter(&builder);
        let sort = query.get_sort(&builder);
        let rows = self.message_rows(|record| record.pointer);
        let pointers = evaluate(rows, &filter, sort, query.skip(), query.take());
        Box::pin(tokio_stream::iter(pointers.into_iter().map(Ok)))
    }

    #[tracing::instrument(skip(self, query))]
    fn enumerate_deltas<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, D, Self::Error>
    where
        Q: MessageQuery + Sync,
    {
        let builder = MemoryMessageBuilder;
        let filter = query.get_filter(&builder);
        let sort = query.get_sort(&builder);
        let rows = self.message_rows(|record| record.delta.clone());
        let deltas = evaluate(rows, &filter, sort, query.skip(), query.take());
        Box::pin(tokio_stream::iter(deltas.into_iter().map(Ok)))
    }

    #[tracing::instrument(skip(self, query))]
    fn enumerate_leases<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, Lease, Self::Error>
    where
        Q: LeaseQuery + Sync,
    {
        let builder = MemoryLeaseBuilder;
        let filter = query.get_filter(&builder);
        let sort = query.get_sort(&builder);
        let rows: Vec<(LeaseRow, Lease)> = {
            let inner = self.inner.read().expect("in-memory store lock poisoned");
            inner
                .leases
                .iter()
                .map(|(lease, pointer)| {
                    let row = LeaseRow {
                        lease: lease.clone(),
                        pointer: *pointer,
                    };
                    (row, lease.clone())
                })
                .collect()
        };
        let leases = evaluate(rows, &filter, sort, query.skip(), query.take());
        Box::pin(tokio_stream::iter(leases.into_iter().map(Ok)))
    }

    #[tracing::instrument(skip(self, query))]
    fn enumerate_tags<'a, Q>(&'a self, query: &'a Q) -> Enumeration<'a, Tag, Self::Error>
    where
        Q: TagQuery + Sync,
    {
        let builder = MemoryTagBuilder;
        let filter = query.get_filter(&builder);
        let sort = query.get_sort(&builder);
        let rows: Vec<(TagRow, Tag)> = {
            let inner = self.inner.read().expect("in-memory store lock poisoned");
            inner
                .tags
                .iter()
                .map(|row| (row.clone(), row.tag.clone()))
                .collect()
        };
        let tags = evaluate(rows, &filter, sort, query.skip(), query.take());
        Box::pin(tokio_stream::iter(tags.into_iter().map(Ok)))
    }
}
