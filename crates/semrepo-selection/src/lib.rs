//! Criteria matching and aspect hierarchy traversal.
//!
//! This crate answers "which device types and services are selectable for
//! this semantic query" over data already loaded from the catalog.
//!
//! ## Architecture
//!
//! - **AspectForest**: arena-indexed aspect taxonomy with cached ancestor and
//!   descendant closures, swapped atomically through a `ForestHandle`
//! - **codec**: canonical short-string form of a filter criterion
//! - **dedup**: removal of criteria that generalize other listed criteria
//! - **CriteriaMatcher**: single criterion vs. single service tuple
//! - **SelectableQueryEngine**: any-match (v1) and all-match (v2) queries
//! - **SelectionService**: async facade over a `MetadataStore`
//!
//! Everything below the service is synchronous and side-effect free.

pub mod codec;
pub mod dedup;
pub mod flatten;
pub mod forest;
pub mod id_modifier;
pub mod matcher;
pub mod resolve;
pub mod selectables;
pub mod service;

pub use codec::ShortCriteria;
pub use dedup::filter_generic_duplicate_criteria;
pub use flatten::{flatten_service, Direction, ServiceTuple};
pub use forest::{AspectForest, ForestHandle};
pub use matcher::{CriteriaMatcher, HierarchyExpansion};
pub use resolve::{resolve_criteria, validate_criteria, ResolvedCriterion};
pub use selectables::{
    DeviceTypeSelectable, MatchMode, SelectableQuery, SelectableQueryEngine, ServicePathOption,
};
pub use service::{AspectUsageFilter, SelectionService};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
