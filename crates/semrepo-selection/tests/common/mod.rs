//! Shared catalog fixture.
//!
//! ```text
//! air
//! ├── inside_air
//! └── outside_air
//! ```

#![allow(dead_code)]

use std::collections::HashMap;

use semrepo_core::{
    AspectNode, ContentVariable, DeviceType, FilterCriteria, Function, Interaction, Service,
    ServiceGroup,
};

pub const F_TEMP: &str = "urn:infai:ses:measuring-function:temperature";
pub const F_HUM: &str = "urn:infai:ses:measuring-function:humidity";
pub const F_ON: &str = "urn:infai:ses:controlling-function:set_on";

pub fn aspect_nodes() -> Vec<AspectNode> {
    vec![
        AspectNode::new("air", "Air"),
        AspectNode::new("inside_air", "Inside Air").with_parent("air"),
        AspectNode::new("outside_air", "Outside Air").with_parent("air"),
    ]
}

pub fn functions() -> Vec<Function> {
    vec![
        Function::measuring(F_TEMP, "getTemperature"),
        Function::measuring(F_HUM, "getHumidity"),
        Function::controlling(F_ON, "setOn"),
    ]
}

pub fn function_map() -> HashMap<String, Function> {
    functions().into_iter().map(|f| (f.id.clone(), f)).collect()
}

fn measurement(name: &str, function: &str, aspect: &str) -> ContentVariable {
    ContentVariable::new(name, "float")
        .with_function(function)
        .with_aspect(aspect)
        .with_characteristic("urn:infai:ses:characteristic:celsius")
}

/// Two services, each measuring one thing.
pub fn split_sensor() -> DeviceType {
    DeviceType::new("dt_split", "Split Sensor")
        .with_device_class("dc_sensor")
        .with_service(
            Service::new("s_x", "getTemperature", Interaction::Event).with_output(
                ContentVariable::new("value", "structure")
                    .with_sub(measurement("temp", F_TEMP, "inside_air")),
            ),
        )
        .with_service(
            Service::new("s_y", "getHumidity", Interaction::Request).with_output(
                ContentVariable::new("value", "structure")
                    .with_sub(measurement("hum", F_HUM, "inside_air")),
            ),
        )
}

/// One service measuring both things on separate paths.
pub fn combo_sensor() -> DeviceType {
    DeviceType::new("dt_combo", "Combo Sensor")
        .with_device_class("dc_sensor")
        .with_service(
            Service::new("s_both", "getClimate", Interaction::Request).with_output(
                ContentVariable::new("value", "structure")
                    .with_sub(measurement("temp", F_TEMP, "inside_air"))
                    .with_sub(measurement("hum", F_HUM, "inside_air")),
            ),
        )
}

/// Power strip with one switchable socket per service group.
pub fn power_strip() -> DeviceType {
    DeviceType::new("dt_strip", "Power Strip")
        .with_device_class("dc_strip")
        .with_service_group(ServiceGroup::new("g1", "Socket 1"))
        .with_service_group(ServiceGroup::new("g2", "Socket 2"))
        .with_service(
            Service::new("s_on1", "setOn1", Interaction::Request)
                .in_group("g1")
                .with_input(ContentVariable::new("on", "bool").with_function(F_ON)),
        )
        .with_service(
            Service::new("s_on2", "setOn2", Interaction::Request)
                .in_group("g2")
                .with_input(ContentVariable::new("on", "bool").with_function(F_ON)),
        )
}

pub fn device_types() -> Vec<DeviceType> {
    vec![split_sensor(), combo_sensor(), power_strip()]
}

/// Temperature anywhere in the air.
pub fn temperature() -> FilterCriteria {
    FilterCriteria::with_aspect(F_TEMP, "air", Interaction::EventAndRequest)
}

/// Humidity inside.
pub fn humidity() -> FilterCriteria {
    FilterCriteria::with_aspect(F_HUM, "inside_air", Interaction::EventAndRequest)
}

pub fn switch_strip() -> FilterCriteria {
    FilterCriteria::with_device_class(F_ON, "dc_strip", Interaction::Request)
}
