//! In-memory catalog store.

use async_trait::async_trait;
use dashmap::DashMap;

use semrepo_core::{AspectNode, DeviceType, DeviceTypeFilter, Function, MetadataStore, Result};

use crate::catalog::Catalog;
use crate::error::Error as StorageError;

/// Concurrent in-memory store keyed by entity id.
#[derive(Default)]
pub struct MemoryStore {
    aspect_nodes: DashMap<String, AspectNode>,
    functions: DashMap<String, Function>,
    device_types: DashMap<String, DeviceType>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from a catalog. Derived aspect fields are dropped.
    pub fn from_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        for node in catalog.aspect_nodes {
            store.aspect_nodes.insert(node.id.clone(), node.without_derived());
        }
        for function in catalog.functions {
            store.functions.insert(function.id.clone(), function);
        }
        for device_type in catalog.device_types {
            store.device_types.insert(device_type.id.clone(), device_type);
        }
        store
    }

    pub fn device_type_count(&self) -> usize {
        self.device_types.len()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn load_all_aspect_nodes(&self) -> Result<Vec<AspectNode>> {
        let mut nodes: Vec<AspectNode> =
            self.aspect_nodes.iter().map(|e| e.value().clone()).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    async fn load_device_types_for_selectable_query(
        &self,
        filter: &DeviceTypeFilter,
    ) -> Result<Vec<DeviceType>> {
        let mut device_types: Vec<DeviceType> = self
            .device_types
            .iter()
            .filter(|e| filter.accepts(e.value()))
            .map(|e| e.value().clone())
            .collect();
        device_types.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(device_types)
    }

    async fn load_function(&self, id: &str) -> Result<Option<Function>> {
        Ok(self.functions.get(id).map(|e| e.value().clone()))
    }

    async fn put_aspect_node(&self, node: AspectNode) -> Result<()> {
        if node.id.is_empty() {
            return Err(StorageError::MissingId { kind: "aspect node" }.into());
        }
        self.aspect_nodes.insert(node.id.clone(), node.without_derived());
        Ok(())
    }

    async fn delete_aspect_node(&self, id: &str) -> Result<bool> {
        if self.aspect_nodes.iter().any(|e| e.value().parent_id == id) {
            return Err(StorageError::HasChildren { id: id.to_string() }.into());
        }
        Ok(self.aspect_nodes.remove(id).is_some())
    }

    async fn put_function(&self, function: Function) -> Result<()> {
        if function.id.is_empty() {
            return Err(StorageError::MissingId { kind: "function" }.into());
        }
        self.functions.insert(function.id.clone(), function);
        Ok(())
    }

    async fn put_device_type(&self, device_type: DeviceType) -> Result<()> {
        if device_type.id.is_empty() {
            return Err(StorageError::MissingId { kind: "device type" }.into());
        }
        self.device_types.insert(device_type.id.clone(), device_type);
        Ok(())
    }

    async fn delete_device_type(&self, id: &str) -> Result<bool> {
        Ok(self.device_types.remove(id).is_some())
    }
}
