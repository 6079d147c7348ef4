//! Core traits and types for the Deltabase event-sourcing engine.
//!
//! This crate provides the backend-independent persistence core:
//!
//! - [`entity`] - Entity contract and versioned state (`Entity`, `State`)
//! - [`delta`] - Delta contract with lease/tag capability accessors
//! - [`source`] - The commit unit (`Message`, `Source`, `Lease`, `Tag`)
//! - [`repository`] - Units of work (`MultiRepository`, `SingleRepository`)
//! - [`concurrency`] - Optimistic-concurrency version resolution
//! - [`query`] - Backend-neutral filter/sort builder abstraction
//! - [`store`] - Source repository boundary and in-memory reference backend
//! - [`snapshot`] - Snapshot repository, policy, and caching wrappers
//! - [`processor`] / [`reprocessor`] - Source replay pipeline
//! - [`agent`] - Commit-time identity and provenance
//!
//! Most users should depend on the `deltabase` crate, which re-exports these
//! types with a cleaner API surface.

pub mod agent;
pub mod concurrency;
pub mod delta;
pub mod entity;
pub mod pointer;
pub mod processor;
pub mod query;
pub mod reprocessor;
pub mod repository;
pub mod snapshot;
pub mod source;
pub mod store;
