//! JSON catalog files.
//!
//! A catalog bundles every entity kind in one document:
//! ```json
//! { "aspect_nodes": [...], "functions": [...], "device_types": [...] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use semrepo_core::{AspectNode, DeviceType, Function, MetadataStore};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub aspect_nodes: Vec<AspectNode>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub device_types: Vec<DeviceType>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| Error::CatalogFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }

    /// Write every entity into `store`. Derived aspect fields are dropped.
    pub async fn load_into(&self, store: &dyn MetadataStore) -> semrepo_core::Result<()> {
        for node in &self.aspect_nodes {
            store.put_aspect_node(node.without_derived()).await?;
        }
        for function in &self.functions {
            store.put_function(function.clone()).await?;
        }
        for device_type in &self.device_types {
            store.put_device_type(device_type.clone()).await?;
        }
        tracing::info!(
            aspect_nodes = self.aspect_nodes.len(),
            functions = self.functions.len(),
            device_types = self.device_types.len(),
            "Catalog loaded"
        );
        Ok(())
    }
}
