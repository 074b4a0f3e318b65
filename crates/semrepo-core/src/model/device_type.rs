//! Device types and their services.
//!
//! A service exposes input and output contents; each content is a tree of
//! content variables. Variables carrying a function id are what semantic
//! queries match against.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::criteria::Interaction;

/// Device type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub device_class_id: String,
    #[serde(default)]
    pub service_groups: Vec<ServiceGroup>,
    #[serde(default)]
    pub services: Vec<Service>,
}

impl DeviceType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            device_class_id: String::new(),
            service_groups: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn with_device_class(mut self, device_class_id: impl Into<String>) -> Self {
        self.device_class_id = device_class_id.into();
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_service_group(mut self, group: ServiceGroup) -> Self {
        self.service_groups.push(group);
        self
    }

    /// Every function id referenced by any content variable of any service.
    pub fn function_ids(&self) -> BTreeSet<&str> {
        let mut ids = BTreeSet::new();
        for service in &self.services {
            for content in service.inputs.iter().chain(service.outputs.iter()) {
                content.content_variable.collect_function_ids(&mut ids);
            }
        }
        ids
    }
}

/// Named subset of a device type's services (e.g. one socket of a power strip).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroup {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ServiceGroup {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
        }
    }
}

/// A device type's unit of functionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub local_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub interaction: Interaction,
    #[serde(default)]
    pub service_group_key: String,
    #[serde(default)]
    pub protocol_id: String,
    #[serde(default)]
    pub inputs: Vec<Content>,
    #[serde(default)]
    pub outputs: Vec<Content>,
}

impl Service {
    pub fn new(id: impl Into<String>, name: impl Into<String>, interaction: Interaction) -> Self {
        let id = id.into();
        Self {
            local_id: id.clone(),
            id,
            name: name.into(),
            description: String::new(),
            interaction,
            service_group_key: String::new(),
            protocol_id: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, variable: ContentVariable) -> Self {
        let id = format!("{}:input:{}", self.id, self.inputs.len());
        self.inputs.push(Content::new(id, variable));
        self
    }

    pub fn with_output(mut self, variable: ContentVariable) -> Self {
        let id = format!("{}:output:{}", self.id, self.outputs.len());
        self.outputs.push(Content::new(id, variable));
        self
    }

    pub fn in_group(mut self, key: impl Into<String>) -> Self {
        self.service_group_key = key.into();
        self
    }
}

/// One serialized message of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    pub content_variable: ContentVariable,
    #[serde(default)]
    pub serialization: String,
    #[serde(default)]
    pub protocol_segment_id: String,
}

impl Content {
    pub fn new(id: impl Into<String>, content_variable: ContentVariable) -> Self {
        Self {
            id: id.into(),
            content_variable,
            serialization: "json".to_string(),
            protocol_segment_id: String::new(),
        }
    }
}

/// A node of a content tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentVariable {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default)]
    pub characteristic_id: String,
    #[serde(default)]
    pub function_id: String,
    #[serde(default)]
    pub aspect_id: String,
    #[serde(default)]
    pub is_void: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub sub_content_variables: Vec<ContentVariable>,
}

impl ContentVariable {
    pub fn new(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            ..Default::default()
        }
    }

    pub fn with_function(mut self, function_id: impl Into<String>) -> Self {
        self.function_id = function_id.into();
        self
    }

    pub fn with_aspect(mut self, aspect_id: impl Into<String>) -> Self {
        self.aspect_id = aspect_id.into();
        self
    }

    pub fn with_characteristic(mut self, characteristic_id: impl Into<String>) -> Self {
        self.characteristic_id = characteristic_id.into();
        self
    }

    pub fn with_sub(mut self, sub: ContentVariable) -> Self {
        self.sub_content_variables.push(sub);
        self
    }

    fn collect_function_ids<'a>(&'a self, ids: &mut BTreeSet<&'a str>) {
        if !self.function_id.is_empty() {
            ids.insert(self.function_id.as_str());
        }
        for sub in &self.sub_content_variables {
            sub.collect_function_ids(ids);
        }
    }
}
