//! Filter criteria and service interactions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether a service capability is event-driven, request-driven, or both.
///
/// `EventAndRequest` is the union of the other two, not a third value:
/// use [`Interaction::matches`] instead of `==` when comparing a criterion
/// with a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interaction {
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "request")]
    Request,
    #[serde(rename = "event+request", alias = "eventAndRequest")]
    EventAndRequest,
}

impl Interaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interaction::Event => "event",
            Interaction::Request => "request",
            Interaction::EventAndRequest => "event+request",
        }
    }

    /// Equal, or either side is `EventAndRequest`.
    pub fn matches(&self, other: &Interaction) -> bool {
        self == other
            || *self == Interaction::EventAndRequest
            || *other == Interaction::EventAndRequest
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interaction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "event" => Ok(Interaction::Event),
            "request" => Ok(Interaction::Request),
            "event+request" | "eventAndRequest" => Ok(Interaction::EventAndRequest),
            other => Err(crate::invalid_criteria_err!("unknown interaction '{}'", other)),
        }
    }
}

/// One semantic query term: a function, optionally narrowed by an aspect
/// (measuring functions) or a device class (controlling functions).
///
/// Equality is field-wise; the aspect hierarchy plays no part in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub function_id: String,
    #[serde(default)]
    pub aspect_id: String,
    #[serde(default)]
    pub device_class_id: String,
    pub interaction: Interaction,
}

impl FilterCriteria {
    pub fn with_aspect(
        function_id: impl Into<String>,
        aspect_id: impl Into<String>,
        interaction: Interaction,
    ) -> Self {
        Self {
            function_id: function_id.into(),
            aspect_id: aspect_id.into(),
            device_class_id: String::new(),
            interaction,
        }
    }

    pub fn with_device_class(
        function_id: impl Into<String>,
        device_class_id: impl Into<String>,
        interaction: Interaction,
    ) -> Self {
        Self {
            function_id: function_id.into(),
            aspect_id: String::new(),
            device_class_id: device_class_id.into(),
            interaction,
        }
    }

    /// A criterion unconstrained by aspect or device class.
    pub fn function_only(function_id: impl Into<String>, interaction: Interaction) -> Self {
        Self {
            function_id: function_id.into(),
            aspect_id: String::new(),
            device_class_id: String::new(),
            interaction,
        }
    }

    pub fn has_aspect(&self) -> bool {
        !self.aspect_id.is_empty()
    }

    pub fn has_device_class(&self) -> bool {
        !self.device_class_id.is_empty()
    }

    /// Structural checks that need no catalog.
    pub fn validate(&self) -> Result<()> {
        if self.function_id.is_empty() {
            return Err(crate::invalid_criteria_err!("criteria without function id"));
        }
        if self.has_aspect() && self.has_device_class() {
            return Err(crate::invalid_criteria_err!(
                "criteria for function {} sets both aspect {} and device class {}",
                self.function_id,
                self.aspect_id,
                self.device_class_id
            ));
        }
        Ok(())
    }
}
