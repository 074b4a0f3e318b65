//! Catalog storage using redb.
//!
//! One table per entity kind, keyed by id, values stored as JSON.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use semrepo_core::{AspectNode, DeviceType, DeviceTypeFilter, Function, MetadataStore};

use crate::error::{Error, Result};

type JsonTable = TableDefinition<'static, &'static str, &'static str>;

// key = aspect node id, value = AspectNode (JSON)
const ASPECT_NODES_TABLE: JsonTable = TableDefinition::new("aspect_nodes");

// key = function id, value = Function (JSON)
const FUNCTIONS_TABLE: JsonTable = TableDefinition::new("functions");

// key = device type id, value = DeviceType (JSON)
const DEVICE_TYPES_TABLE: JsonTable = TableDefinition::new("device_types");

/// Catalog store using redb.
pub struct RedbStore {
    db: Arc<Database>,
    path: String,
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = if path_ref.exists() {
            Database::open(path_ref)?
        } else {
            Database::create(path_ref)?
        };

        // Make sure all tables exist so read transactions never fail on a fresh file
        let write_txn = db.begin_write()?;
        {
            let _aspects = write_txn.open_table(ASPECT_NODES_TABLE)?;
            let _functions = write_txn.open_table(FUNCTIONS_TABLE)?;
            let _device_types = write_txn.open_table(DEVICE_TYPES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            path: path_ref.to_string_lossy().to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn save<T: Serialize>(
        &self,
        table_def: JsonTable,
        id: &str,
        value: &T,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table_def)?;
            table.insert(id, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(
        &self,
        table_def: JsonTable,
        id: &str,
    ) -> Result<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_def)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    /// All values of a table in key order. Undecodable rows are skipped.
    fn list<T: DeserializeOwned>(&self, table_def: JsonTable) -> Result<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_def)?;

        let mut items = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            match serde_json::from_str::<T>(value.value()) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Skipping undecodable row {}: {}", key.value(), e),
            }
        }
        Ok(items)
    }

    fn remove(&self, table_def: JsonTable, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(table_def)?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn list_aspect_nodes(&self) -> Result<Vec<AspectNode>> {
        self.list(ASPECT_NODES_TABLE)
    }

    pub fn list_device_types(&self) -> Result<Vec<DeviceType>> {
        self.list(DEVICE_TYPES_TABLE)
    }

    pub fn list_functions(&self) -> Result<Vec<Function>> {
        self.list(FUNCTIONS_TABLE)
    }

    pub fn save_aspect_node(&self, node: &AspectNode) -> Result<()> {
        if node.id.is_empty() {
            return Err(Error::MissingId { kind: "aspect node" });
        }
        self.save(ASPECT_NODES_TABLE, &node.id, &node.without_derived())
    }

    /// Refuses to delete nodes that still have children.
    pub fn delete_aspect_node_checked(&self, id: &str) -> Result<bool> {
        let has_children = self
            .list_aspect_nodes()?
            .iter()
            .any(|node| node.parent_id == id);
        if has_children {
            return Err(Error::HasChildren { id: id.to_string() });
        }
        self.remove(ASPECT_NODES_TABLE, id)
    }

    pub fn save_function(&self, function: &Function) -> Result<()> {
        if function.id.is_empty() {
            return Err(Error::MissingId { kind: "function" });
        }
        self.save(FUNCTIONS_TABLE, &function.id, function)
    }

    pub fn load_function_by_id(&self, id: &str) -> Result<Option<Function>> {
        self.load(FUNCTIONS_TABLE, id)
    }

    pub fn save_device_type(&self, device_type: &DeviceType) -> Result<()> {
        if device_type.id.is_empty() {
            return Err(Error::MissingId { kind: "device type" });
        }
        self.save(DEVICE_TYPES_TABLE, &device_type.id, device_type)
    }

    pub fn load_device_type(&self, id: &str) -> Result<Option<DeviceType>> {
        self.load(DEVICE_TYPES_TABLE, id)
    }
}

#[async_trait]
impl MetadataStore for RedbStore {
    async fn load_all_aspect_nodes(&self) -> semrepo_core::Result<Vec<AspectNode>> {
        Ok(self.list_aspect_nodes()?)
    }

    async fn load_device_types_for_selectable_query(
        &self,
        filter: &DeviceTypeFilter,
    ) -> semrepo_core::Result<Vec<DeviceType>> {
        let device_types = self.list_device_types()?;
        Ok(device_types
            .into_iter()
            .filter(|dt| filter.accepts(dt))
            .collect())
    }

    async fn load_function(&self, id: &str) -> semrepo_core::Result<Option<Function>> {
        Ok(self.load_function_by_id(id)?)
    }

    async fn put_aspect_node(&self, node: AspectNode) -> semrepo_core::Result<()> {
        Ok(self.save_aspect_node(&node)?)
    }

    async fn delete_aspect_node(&self, id: &str) -> semrepo_core::Result<bool> {
        Ok(self.delete_aspect_node_checked(id)?)
    }

    async fn put_function(&self, function: Function) -> semrepo_core::Result<()> {
        Ok(self.save_function(&function)?)
    }

    async fn put_device_type(&self, device_type: DeviceType) -> semrepo_core::Result<()> {
        Ok(self.save_device_type(&device_type)?)
    }

    async fn delete_device_type(&self, id: &str) -> semrepo_core::Result<bool> {
        Ok(self.remove(DEVICE_TYPES_TABLE, id)?)
    }
}
