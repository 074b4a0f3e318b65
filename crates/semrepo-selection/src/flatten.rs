//! Service content trees flattened into matchable tuples.

use serde::{Deserialize, Serialize};

use semrepo_core::{ContentVariable, DeviceType, Interaction, Service};

/// Which side of a service a tuple comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// One content variable carrying a function id, seen from a criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTuple {
    pub direction: Direction,
    pub function_id: String,
    pub aspect_id: String,
    pub device_class_id: String,
    pub interaction: Interaction,
    /// Variable names from the content root, joined with `.`.
    pub path: String,
    pub characteristic_id: String,
    pub is_void: bool,
    pub value: Option<serde_json::Value>,
    pub value_type: String,
}

impl ServiceTuple {
    fn from_variable(
        direction: Direction,
        variable: &ContentVariable,
        device_class_id: &str,
        interaction: Interaction,
        path: String,
    ) -> Self {
        Self {
            direction,
            function_id: variable.function_id.clone(),
            aspect_id: variable.aspect_id.clone(),
            device_class_id: match direction {
                Direction::Input => device_class_id.to_string(),
                Direction::Output => String::new(),
            },
            interaction,
            path,
            characteristic_id: variable.characteristic_id.clone(),
            is_void: variable.is_void,
            value: variable.value.clone(),
            value_type: variable.value_type.clone(),
        }
    }

    /// Bare output tuple, mostly for tests.
    pub fn output(
        function_id: impl Into<String>,
        aspect_id: impl Into<String>,
        interaction: Interaction,
        path: impl Into<String>,
    ) -> Self {
        Self {
            direction: Direction::Output,
            function_id: function_id.into(),
            aspect_id: aspect_id.into(),
            device_class_id: String::new(),
            interaction,
            path: path.into(),
            characteristic_id: String::new(),
            is_void: false,
            value: None,
            value_type: String::new(),
        }
    }

    /// Bare input tuple, mostly for tests.
    pub fn input(
        function_id: impl Into<String>,
        device_class_id: impl Into<String>,
        interaction: Interaction,
        path: impl Into<String>,
    ) -> Self {
        Self {
            direction: Direction::Input,
            device_class_id: device_class_id.into(),
            ..Self::output(function_id, "", interaction, path)
        }
    }
}

/// Every tuple of one service, inputs first, depth first within a content.
pub fn flatten_service(device_type: &DeviceType, service: &Service) -> Vec<ServiceTuple> {
    let mut tuples = Vec::new();
    let sides = [
        (Direction::Input, &service.inputs),
        (Direction::Output, &service.outputs),
    ];
    for (direction, contents) in sides {
        for content in contents {
            walk(
                direction,
                &content.content_variable,
                "",
                &device_type.device_class_id,
                service.interaction,
                &mut tuples,
            );
        }
    }
    tuples
}

fn walk(
    direction: Direction,
    variable: &ContentVariable,
    prefix: &str,
    device_class_id: &str,
    interaction: Interaction,
    out: &mut Vec<ServiceTuple>,
) {
    let path = if prefix.is_empty() {
        variable.name.clone()
    } else {
        format!("{}.{}", prefix, variable.name)
    };
    for sub in &variable.sub_content_variables {
        walk(direction, sub, &path, device_class_id, interaction, out);
    }
    if !variable.function_id.is_empty() {
        out.push(ServiceTuple::from_variable(
            direction,
            variable,
            device_class_id,
            interaction,
            path,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths_and_directions() {
        let dt = DeviceType::new("dt1", "Lamp").with_device_class("dc1").with_service(
            Service::new("s1", "setBrightness", Interaction::Request)
                .with_input(
                    ContentVariable::new("brightness", "integer").with_function("f-set"),
                )
                .with_output(
                    ContentVariable::new("value", "structure")
                        .with_sub(
                            ContentVariable::new("level", "integer")
                                .with_function("f-get")
                                .with_aspect("light"),
                        )
                        .with_sub(ContentVariable::new("unit", "string")),
                ),
        );
        let tuples = flatten_service(&dt, &dt.services[0]);
        assert_eq!(tuples.len(), 2);

        assert_eq!(tuples[0].direction, Direction::Input);
        assert_eq!(tuples[0].path, "brightness");
        assert_eq!(tuples[0].device_class_id, "dc1");

        assert_eq!(tuples[1].direction, Direction::Output);
        assert_eq!(tuples[1].path, "value.level");
        assert_eq!(tuples[1].aspect_id, "light");
        assert!(tuples[1].device_class_id.is_empty());
        assert_eq!(tuples[1].interaction, Interaction::Request);
    }

    #[test]
    fn test_variables_without_function_are_skipped() {
        let dt = DeviceType::new("dt1", "Sensor").with_service(
            Service::new("s1", "get", Interaction::Event)
                .with_output(ContentVariable::new("raw", "string")),
        );
        assert!(flatten_service(&dt, &dt.services[0]).is_empty());
    }
}
