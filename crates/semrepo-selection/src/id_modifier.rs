//! Modified device type ids.
//!
//! A modified id scopes a device type to a subset of itself:
//! `{base}$key=value&key2=value2`. Values are percent-encoded.

use semrepo_core::{Error, Result};

pub const MODIFIER_SEPARATOR: char = '$';
pub const SERVICE_GROUP_SELECTION: &str = "service_group_selection";

/// Append modifiers to `base`. No modifiers yields `base` unchanged.
pub fn join(base: &str, modifiers: &[(&str, &str)]) -> String {
    if modifiers.is_empty() {
        return base.to_string();
    }
    let pairs: Vec<String> = modifiers
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    format!("{}{}{}", base, MODIFIER_SEPARATOR, pairs.join("&"))
}

/// Device type id scoped to one service group.
pub fn service_group_selection(base: &str, group_key: &str) -> String {
    join(base, &[(SERVICE_GROUP_SELECTION, group_key)])
}

/// Split a possibly modified id into its base and decoded modifiers.
pub fn split(id: &str) -> Result<(String, Vec<(String, String)>)> {
    let Some((base, rest)) = id.split_once(MODIFIER_SEPARATOR) else {
        return Ok((id.to_string(), Vec::new()));
    };
    let mut modifiers = Vec::new();
    for pair in rest.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::validation(format!("malformed id modifier '{}' in {}", pair, id)))?;
        let value = urlencoding::decode(value)
            .map_err(|e| Error::validation(format!("malformed id modifier value in {}: {}", id, e)))?;
        modifiers.push((key.to_string(), value.into_owned()));
    }
    Ok((base.to_string(), modifiers))
}

/// Whether `id` carries any modifier.
pub fn is_modified(id: &str) -> bool {
    id.contains(MODIFIER_SEPARATOR)
}
