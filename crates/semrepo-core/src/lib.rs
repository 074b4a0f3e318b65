//! Core traits and types for semrepo.
//!
//! This crate defines the domain model of the semantic metadata registry
//! (aspect nodes, functions, device types, filter criteria), the unified
//! error type, engine configuration, entity change events and the storage
//! collaborator interface the selection engine reads from.

pub mod config;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod model;
pub mod storage;

pub use config::{EngineConfig, ExpansionMode};
pub use error::{Error, Result};
pub use event::{EventMetadata, RepoEvent};
pub use eventbus::{EventBus, EventBusReceiver, FilteredReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use model::{
    AspectNode, Content, ContentVariable, DeviceType, FilterCriteria, Function, FunctionKind,
    Interaction, Service, ServiceGroup,
};
pub use storage::{DeviceTypeFilter, MetadataStore, SharedStore};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::{defaults, env_vars, EngineConfig, ExpansionMode};
    pub use crate::error::{Error, Result};
    pub use crate::event::{EventMetadata, RepoEvent};
    pub use crate::eventbus::EventBus;
    pub use crate::model::{
        AspectNode, Content, ContentVariable, DeviceType, FilterCriteria, Function,
        FunctionKind, Interaction, Service, ServiceGroup,
    };
    pub use crate::storage::{DeviceTypeFilter, MetadataStore, SharedStore};
}
