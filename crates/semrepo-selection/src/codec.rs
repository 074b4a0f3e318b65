//! Canonical short form of a filter criterion.
//!
//! `{function}_{aspect}_{device_class}_{interaction}`, empty fields kept as
//! empty positions: `f1_a1__event`, `f2__dc1_request`, `f3___event+request`.
//! Id fields are percent-encoded (including `_`), so the four positions can
//! always be recovered and distinct criteria never share a short form.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use semrepo_core::{Error, FilterCriteria, Interaction, Result};

const FIELD_SEPARATOR: char = '_';

/// Encoded criterion, usable as a set or storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCriteria(String);

impl ShortCriteria {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCriteria {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn escape(field: &str) -> Cow<'_, str> {
    let encoded = urlencoding::encode(field);
    if encoded.contains(FIELD_SEPARATOR) {
        Cow::Owned(encoded.replace(FIELD_SEPARATOR, "%5F"))
    } else {
        encoded
    }
}

fn unescape(field: &str) -> Result<String> {
    urlencoding::decode(field)
        .map(Cow::into_owned)
        .map_err(|e| Error::invalid_criteria(format!("bad short criteria field '{}': {}", field, e)))
}

/// Encode a criterion. Pure and total.
pub fn encode(criteria: &FilterCriteria) -> ShortCriteria {
    ShortCriteria(format!(
        "{}{sep}{}{sep}{}{sep}{}",
        escape(&criteria.function_id),
        escape(&criteria.aspect_id),
        escape(&criteria.device_class_id),
        criteria.interaction.as_str(),
        sep = FIELD_SEPARATOR
    ))
}

/// Inverse of [`encode`].
pub fn decode(short: &str) -> Result<FilterCriteria> {
    let fields: Vec<&str> = short.split(FIELD_SEPARATOR).collect();
    let [function_id, aspect_id, device_class_id, interaction] = fields.as_slice() else {
        return Err(Error::invalid_criteria(format!(
            "short criteria '{}' must have 4 fields",
            short
        )));
    };
    Ok(FilterCriteria {
        function_id: unescape(function_id)?,
        aspect_id: unescape(aspect_id)?,
        device_class_id: unescape(device_class_id)?,
        interaction: interaction.parse::<Interaction>()?,
    })
}
