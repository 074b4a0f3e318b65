//! Storage collaborator interface.
//!
//! The selection engine never performs I/O itself. The service layer pulls
//! fully materialized entities through this trait and hands them to the
//! engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AspectNode, DeviceType, Function};

/// Pre-filter applied by the store when loading selectable candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTypeFilter {
    /// Keep device types referencing at least one of these functions.
    /// Empty keeps everything.
    pub function_ids: BTreeSet<String>,
    /// Visibility scope of the caller as resolved by the permission
    /// service. `None` means unrestricted.
    pub visible_ids: Option<BTreeSet<String>>,
}

impl DeviceTypeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_functions<I, S>(function_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            function_ids: function_ids.into_iter().map(Into::into).collect(),
            visible_ids: None,
        }
    }

    pub fn visible_to<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a device type passes this filter.
    pub fn accepts(&self, device_type: &DeviceType) -> bool {
        if let Some(visible) = &self.visible_ids {
            if !visible.contains(&device_type.id) {
                return false;
            }
        }
        if self.function_ids.is_empty() {
            return true;
        }
        device_type
            .function_ids()
            .into_iter()
            .any(|id| self.function_ids.contains(id))
    }
}

/// Document store holding the catalog.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Every aspect node, derived fields not filled.
    async fn load_all_aspect_nodes(&self) -> Result<Vec<AspectNode>>;

    /// Candidate device types for a selectable query, sorted by id.
    async fn load_device_types_for_selectable_query(
        &self,
        filter: &DeviceTypeFilter,
    ) -> Result<Vec<DeviceType>>;

    async fn load_function(&self, id: &str) -> Result<Option<Function>>;

    async fn put_aspect_node(&self, node: AspectNode) -> Result<()>;

    /// Fails with `Error::Validation` if the node still has children.
    async fn delete_aspect_node(&self, id: &str) -> Result<bool>;

    async fn put_function(&self, function: Function) -> Result<()>;

    async fn put_device_type(&self, device_type: DeviceType) -> Result<()>;

    async fn delete_device_type(&self, id: &str) -> Result<bool>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn MetadataStore>;
