//! Functions classify what a service measures or controls.

use serde::{Deserialize, Serialize};

const MEASURING_ID_MARKER: &str = ":measuring-function:";
const CONTROLLING_ID_MARKER: &str = ":controlling-function:";

/// Measuring functions produce data and pair with aspects; controlling
/// functions accept commands and pair with device classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Measuring,
    Controlling,
}

impl FunctionKind {
    /// Classify by the conventional id layout, e.g.
    /// `urn:infai:ses:measuring-function:temperature`.
    pub fn from_id(id: &str) -> Option<Self> {
        if id.contains(MEASURING_ID_MARKER) {
            Some(Self::Measuring)
        } else if id.contains(CONTROLLING_ID_MARKER) {
            Some(Self::Controlling)
        } else {
            None
        }
    }
}

/// A function entity as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub concept_id: String,
    pub rdf_type: FunctionKind,
}

impl Function {
    pub fn measuring(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FunctionKind::Measuring)
    }

    pub fn controlling(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FunctionKind::Controlling)
    }

    fn new(id: impl Into<String>, name: impl Into<String>, rdf_type: FunctionKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            concept_id: String::new(),
            rdf_type,
        }
    }

    pub fn is_measuring(&self) -> bool {
        self.rdf_type == FunctionKind::Measuring
    }
}
