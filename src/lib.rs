#![doc = include_str!("../README.md")]

pub use deltabase_core::{
    agent,
    agent::{Agent, AgentStamp, SystemAgent},
    concurrency,
    concurrency::{ConcurrencyConflict, SourceResolution, VersionZeroError, resolve_source},
    delta::Delta,
    entity,
    entity::{Entity, ReplayError, State},
    pointer::{Id, Pointer, Version},
    repository,
    repository::{LoadError, MultiRepository, SingleRepository, UsageError},
    source::{Lease, Message, Source, Tag, VersionTarget},
};

pub mod query {
    pub use deltabase_core::query::{
        FilterCombinators, LeaseFilterBuilder, LeaseQuery, LeaseSortBuilder,
        MessageFilterBuilder, MessageQuery, MessageSortBuilder, ModifiedQuery, QueryModifier,
        Reverse, SortCombinators, SourceFilterBuilder, SourceQuery, SourceSortBuilder,
        TagFilterBuilder, TagQuery, TagSortBuilder,
    };
}

pub mod store {
    pub use deltabase_core::store::{Enumeration, SourceRepository, inmemory};
}

pub mod snapshot {
    pub use deltabase_core::snapshot::{
        NoSnapshotRepository, SnapshotPolicy, SnapshotRepository, caching, fault, inmemory,
        testmode,
    };
}

pub mod processor {
    pub use deltabase_core::processor::{
        EntitySnapshotProcessor, ProcessorError, ProcessorFuture, SourceProcessor,
    };
}

pub mod reprocessor {
    pub use deltabase_core::reprocessor::{QueueClosed, ReprocessRequest, ReprocessorQueue};
}
