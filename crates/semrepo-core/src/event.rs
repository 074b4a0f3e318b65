//! Entity change notifications.
//!
//! The write path of the registry publishes one of these whenever an entity
//! changes. The selection service only reacts to aspect node changes, which
//! invalidate the aspect forest.

use serde::{Deserialize, Serialize};

/// Change event for a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepoEvent {
    /// Aspect node created, renamed or re-parented.
    AspectNodeUpdated { id: String, timestamp: i64 },
    AspectNodeDeleted { id: String, timestamp: i64 },
    FunctionUpdated { id: String, timestamp: i64 },
    DeviceTypeUpdated { id: String, timestamp: i64 },
    DeviceTypeDeleted { id: String, timestamp: i64 },
}

impl RepoEvent {
    pub fn aspect_node_updated(id: impl Into<String>) -> Self {
        Self::AspectNodeUpdated {
            id: id.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn aspect_node_deleted(id: impl Into<String>) -> Self {
        Self::AspectNodeDeleted {
            id: id.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn device_type_updated(id: impl Into<String>) -> Self {
        Self::DeviceTypeUpdated {
            id: id.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Get the event type name as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AspectNodeUpdated { .. } => "AspectNodeUpdated",
            Self::AspectNodeDeleted { .. } => "AspectNodeDeleted",
            Self::FunctionUpdated { .. } => "FunctionUpdated",
            Self::DeviceTypeUpdated { .. } => "DeviceTypeUpdated",
            Self::DeviceTypeDeleted { .. } => "DeviceTypeDeleted",
        }
    }

    /// Id of the changed entity.
    pub fn entity_id(&self) -> &str {
        match self {
            Self::AspectNodeUpdated { id, .. }
            | Self::AspectNodeDeleted { id, .. }
            | Self::FunctionUpdated { id, .. }
            | Self::DeviceTypeUpdated { id, .. }
            | Self::DeviceTypeDeleted { id, .. } => id,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::AspectNodeUpdated { timestamp, .. }
            | Self::AspectNodeDeleted { timestamp, .. }
            | Self::FunctionUpdated { timestamp, .. }
            | Self::DeviceTypeUpdated { timestamp, .. }
            | Self::DeviceTypeDeleted { timestamp, .. } => *timestamp,
        }
    }

    /// Whether the aspect forest must be rebuilt.
    pub fn is_aspect_change(&self) -> bool {
        matches!(
            self,
            Self::AspectNodeUpdated { .. } | Self::AspectNodeDeleted { .. }
        )
    }
}

/// Event metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub event_id: String,
    /// Optional correlation ID (for grouping related events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Event source (component that published)
    pub source: String,
    pub timestamp: i64,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            correlation_id: None,
            source: source.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}
