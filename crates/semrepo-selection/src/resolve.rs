//! Criteria resolution against the loaded functions.

use std::collections::HashMap;

use semrepo_core::{
    invalid_criteria_err, unknown_reference_err, EngineConfig, FilterCriteria, Function,
    FunctionKind, Result,
};

use crate::codec::{self, ShortCriteria};
use crate::flatten::Direction;

/// A validated criterion together with the side of a service it inspects.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCriterion {
    pub criteria: FilterCriteria,
    pub short: ShortCriteria,
    /// `None` when the function is unknown; such a criterion never matches.
    pub kind: Option<FunctionKind>,
}

impl ResolvedCriterion {
    pub fn direction(&self) -> Option<Direction> {
        self.kind.map(|kind| match kind {
            FunctionKind::Measuring => Direction::Output,
            FunctionKind::Controlling => Direction::Input,
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.kind.is_none()
    }
}

/// Catalog-free checks over the list as the caller sent it.
///
/// Runs before dedup, so a malformed criterion is reported even when a more
/// specific one would have replaced it, and repeats count against the limit.
pub fn validate_criteria(criteria: &[FilterCriteria], config: &EngineConfig) -> Result<()> {
    if criteria.len() > config.max_criteria {
        return Err(invalid_criteria_err!(
            "{} criteria exceed the limit of {}",
            criteria.len(),
            config.max_criteria
        ));
    }
    criteria.iter().try_for_each(FilterCriteria::validate)
}

/// Validate every criterion and classify it by function kind.
///
/// Structural problems fail the whole list with `InvalidCriteria`. A function
/// missing from the store is classified by its id convention when possible;
/// otherwise the criterion degrades to never matching, unless
/// `strict_references` is set, in which case it fails with `UnknownReference`.
pub fn resolve_criteria(
    criteria: &[FilterCriteria],
    functions: &HashMap<String, Function>,
    config: &EngineConfig,
) -> Result<Vec<ResolvedCriterion>> {
    validate_criteria(criteria, config)?;

    let mut resolved = Vec::with_capacity(criteria.len());
    for c in criteria {
        let kind = match functions.get(&c.function_id) {
            Some(function) => Some(function.rdf_type),
            None if config.strict_references => {
                return Err(unknown_reference_err!("function {}", c.function_id));
            }
            None => {
                let kind = FunctionKind::from_id(&c.function_id);
                match kind {
                    Some(kind) => tracing::debug!(
                        "Function {} not in catalog, classified as {:?} by id",
                        c.function_id,
                        kind
                    ),
                    None => tracing::warn!(
                        "Unknown function {} in criteria, it will not match anything",
                        c.function_id
                    ),
                }
                kind
            }
        };
        if kind == Some(FunctionKind::Measuring) && c.has_device_class() {
            return Err(invalid_criteria_err!(
                "measuring function {} cannot be narrowed by device class {}",
                c.function_id,
                c.device_class_id
            ));
        }
        resolved.push(ResolvedCriterion {
            short: codec::encode(c),
            criteria: c.clone(),
            kind,
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semrepo_core::{Error, Interaction};

    fn functions() -> HashMap<String, Function> {
        [
            Function::measuring("f1", "temperature"),
            Function::controlling("f2", "setOn"),
        ]
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect()
    }

    #[test]
    fn test_kinds_and_directions() {
        let resolved = resolve_criteria(
            &[
                FilterCriteria::with_aspect("f1", "a1", Interaction::Event),
                FilterCriteria::with_device_class("f2", "dc1", Interaction::Request),
            ],
            &functions(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(resolved[0].direction(), Some(Direction::Output));
        assert_eq!(resolved[1].direction(), Some(Direction::Input));
        assert_eq!(resolved[1].short.as_str(), "f2__dc1_request");
    }

    #[test]
    fn test_unknown_function_degrades() {
        let resolved = resolve_criteria(
            &[FilterCriteria::function_only("f9", Interaction::Event)],
            &functions(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(resolved[0].is_degraded());
        assert_eq!(resolved[0].direction(), None);
    }

    #[test]
    fn test_missing_function_classified_by_id() {
        let resolved = resolve_criteria(
            &[
                FilterCriteria::with_aspect(
                    "urn:infai:ses:measuring-function:co2",
                    "a1",
                    Interaction::Event,
                ),
                FilterCriteria::with_device_class(
                    "urn:infai:ses:controlling-function:dim",
                    "dc1",
                    Interaction::Request,
                ),
            ],
            &functions(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(resolved[0].direction(), Some(Direction::Output));
        assert_eq!(resolved[1].direction(), Some(Direction::Input));
        assert!(!resolved[0].is_degraded());
    }

    #[test]
    fn test_missing_measuring_function_still_rejects_device_class() {
        let err = resolve_criteria(
            &[FilterCriteria::with_device_class(
                "urn:infai:ses:measuring-function:co2",
                "dc1",
                Interaction::Event,
            )],
            &functions(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCriteria(_)));
    }

    #[test]
    fn test_unknown_function_strict() {
        let config = EngineConfig {
            strict_references: true,
            ..Default::default()
        };
        let err = resolve_criteria(
            &[FilterCriteria::function_only("f9", Interaction::Event)],
            &functions(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownReference(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_device_class_on_measuring_is_invalid() {
        let err = resolve_criteria(
            &[FilterCriteria::with_device_class("f1", "dc1", Interaction::Event)],
            &functions(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCriteria(_)));
    }

    #[test]
    fn test_too_many_criteria() {
        let config = EngineConfig {
            max_criteria: 1,
            ..Default::default()
        };
        let criteria = vec![FilterCriteria::function_only("f1", Interaction::Event); 2];
        assert!(matches!(
            resolve_criteria(&criteria, &functions(), &config),
            Err(Error::InvalidCriteria(_))
        ));
        assert!(matches!(
            validate_criteria(&criteria, &config),
            Err(Error::InvalidCriteria(_))
        ));
        assert!(validate_criteria(&criteria[..1], &config).is_ok());
    }
}
