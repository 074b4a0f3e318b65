//! Aspect nodes: the "which part of a thing" taxonomy.

use serde::{Deserialize, Serialize};

/// A node of the aspect forest.
///
/// Only `id`, `name` and `parent_id` are authored. The remaining fields are
/// derived by the aspect forest and ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AspectNode {
    pub id: String,
    pub name: String,
    /// Empty for roots.
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub child_ids: Vec<String>,
    #[serde(default)]
    pub root_id: String,
    /// Immediate parent first, root last.
    #[serde(default)]
    pub ancestor_ids: Vec<String>,
    #[serde(default)]
    pub descendent_ids: Vec<String>,
}

impl AspectNode {
    /// Create a root node.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    /// Copy of the authored fields only.
    pub fn without_derived(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            parent_id: self.parent_id.clone(),
            ..Default::default()
        }
    }
}
