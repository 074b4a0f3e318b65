//! Selectable queries over device types.
//!
//! Criteria are validated as sent, reduced with the generic duplicate
//! filter, then resolved against the loaded functions. Each service of each candidate
//! device type is flattened into tuples and every tuple is tested against
//! every criterion. How matches turn into results depends on [`MatchMode`]:
//!
//! - `Any`: a service is listed when at least one criterion matches one of
//!   its tuples; a device type is selectable when it lists a service.
//! - `AllPerService`: a device type is selectable when every criterion is
//!   matched somewhere in it; a service is listed only when it can match
//!   every criterion on pairwise distinct content variables.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use semrepo_core::{
    AspectNode, DeviceType, EngineConfig, FilterCriteria, Function, Interaction, Result, Service,
};

use crate::codec::ShortCriteria;
use crate::dedup::filter_generic_duplicate_criteria;
use crate::flatten::{flatten_service, ServiceTuple};
use crate::forest::AspectForest;
use crate::id_modifier;
use crate::matcher::{CriteriaMatcher, HierarchyExpansion};
use crate::resolve::{resolve_criteria, validate_criteria, ResolvedCriterion};

/// How matched services combine into a selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Any,
    AllPerService,
}

/// Parameters of one selectable query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectableQuery {
    pub criteria: Vec<FilterCriteria>,
    /// Only tuples whose path starts with this prefix are inspected.
    pub path_prefix: String,
    /// Service interaction allow-list. Empty allows every service.
    pub interactions: Vec<Interaction>,
    /// Emit one extra selectable per matching service group.
    pub include_modified: bool,
    /// Attach the full device type to each selectable.
    pub include_device_types: bool,
    pub mode: MatchMode,
}

impl SelectableQuery {
    pub fn new(criteria: Vec<FilterCriteria>) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    pub fn with_interactions(mut self, interactions: Vec<Interaction>) -> Self {
        self.interactions = interactions;
        self
    }

    pub fn with_modified(mut self, include: bool) -> Self {
        self.include_modified = include;
        self
    }

    pub fn with_device_types(mut self, include: bool) -> Self {
        self.include_device_types = include;
        self
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// One matched content variable of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePathOption {
    pub service_id: String,
    pub path: String,
    #[serde(default)]
    pub characteristic_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_node: Option<AspectNode>,
    pub function_id: String,
    #[serde(default)]
    pub is_void: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub value_type: String,
    pub interaction: Interaction,
    /// Every criterion that matched this path.
    pub matched_criteria: Vec<ShortCriteria>,
}

/// A device type (or a scoped variant of one) that satisfies a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTypeSelectable {
    pub device_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    pub services: Vec<Service>,
    pub service_path_options: BTreeMap<String, Vec<ServicePathOption>>,
}

impl DeviceTypeSelectable {
    pub fn service_ids(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Tuples of one service that matched at least one criterion.
struct ServiceMatch<'d> {
    service: &'d Service,
    options: Vec<(ServiceTuple, Vec<usize>)>,
}

impl ServiceMatch<'_> {
    fn covers(&self, criterion: usize) -> bool {
        self.options.iter().any(|(_, hits)| hits.contains(&criterion))
    }

    /// Whether every criterion can be given its own content variable.
    ///
    /// Each option is one variable, so two contents sharing a path name
    /// (an input and an output both called `value`) stay separate.
    fn assigns_all(&self, criteria_count: usize) -> bool {
        let mut candidates: Vec<Vec<usize>> = vec![Vec::new(); criteria_count];
        for (slot, (_, hits)) in self.options.iter().enumerate() {
            for &c in hits {
                candidates[c].push(slot);
            }
        }
        has_complete_assignment(&candidates, self.options.len())
    }
}

/// Kuhn's augmenting path matching: can every left node get a distinct right node?
fn has_complete_assignment(candidates: &[Vec<usize>], right_count: usize) -> bool {
    if candidates.len() > right_count {
        return false;
    }
    let mut owner: Vec<Option<usize>> = vec![None; right_count];
    for left in 0..candidates.len() {
        let mut visited = vec![false; right_count];
        if !augment(left, candidates, &mut owner, &mut visited) {
            return false;
        }
    }
    true
}

fn augment(
    left: usize,
    candidates: &[Vec<usize>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &right in &candidates[left] {
        if visited[right] {
            continue;
        }
        visited[right] = true;
        let free = match owner[right] {
            None => true,
            Some(other) => augment(other, candidates, owner, visited),
        };
        if free {
            owner[right] = Some(left);
            return true;
        }
    }
    false
}

/// Stateless query engine over one forest snapshot and one functions map.
pub struct SelectableQueryEngine<'a> {
    forest: &'a AspectForest,
    functions: &'a HashMap<String, Function>,
    config: &'a EngineConfig,
}

impl<'a> SelectableQueryEngine<'a> {
    pub fn new(
        forest: &'a AspectForest,
        functions: &'a HashMap<String, Function>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            forest,
            functions,
            config,
        }
    }

    /// Any-match query.
    pub fn query_v1(
        &self,
        device_types: &[DeviceType],
        criteria: &[FilterCriteria],
        path_prefix: &str,
        interactions: &[Interaction],
        include_modified: bool,
        include_device_types: bool,
    ) -> Result<Vec<DeviceTypeSelectable>> {
        let query = SelectableQuery::new(criteria.to_vec())
            .with_path_prefix(path_prefix)
            .with_interactions(interactions.to_vec())
            .with_modified(include_modified)
            .with_device_types(include_device_types);
        self.query(device_types, &query)
    }

    /// Any-match query without interaction filter, or all-match when
    /// `services_must_match_all_criteria` is set.
    pub fn query_v2(
        &self,
        device_types: &[DeviceType],
        criteria: &[FilterCriteria],
        path_prefix: &str,
        include_modified: bool,
        services_must_match_all_criteria: bool,
        include_device_types: bool,
    ) -> Result<Vec<DeviceTypeSelectable>> {
        let mode = if services_must_match_all_criteria {
            MatchMode::AllPerService
        } else {
            MatchMode::Any
        };
        let query = SelectableQuery::new(criteria.to_vec())
            .with_path_prefix(path_prefix)
            .with_modified(include_modified)
            .with_device_types(include_device_types)
            .with_mode(mode);
        self.query(device_types, &query)
    }

    pub fn query(
        &self,
        device_types: &[DeviceType],
        query: &SelectableQuery,
    ) -> Result<Vec<DeviceTypeSelectable>> {
        validate_criteria(&query.criteria, self.config)?;
        let criteria = filter_generic_duplicate_criteria(self.forest, &query.criteria);
        let resolved = resolve_criteria(&criteria, self.functions, self.config)?;
        if resolved.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(
            "Selectable query: {} criteria ({} after dedup), {} candidate device types, mode {:?}",
            query.criteria.len(),
            resolved.len(),
            device_types.len(),
            query.mode
        );

        let mut ordered: Vec<&DeviceType> = device_types.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let mut results = Vec::new();
        for device_type in ordered {
            let matches = self.match_services(device_type, &resolved, query);
            let services: Vec<&ServiceMatch> = match query.mode {
                MatchMode::Any => {
                    if matches.is_empty() {
                        continue;
                    }
                    matches.iter().collect()
                }
                MatchMode::AllPerService => {
                    let covered =
                        (0..resolved.len()).all(|c| matches.iter().any(|m| m.covers(c)));
                    if !covered {
                        continue;
                    }
                    matches
                        .iter()
                        .filter(|m| m.assigns_all(resolved.len()))
                        .collect()
                }
            };

            results.push(self.selectable(
                device_type,
                device_type.id.clone(),
                &services,
                &resolved,
                query.include_device_types,
            ));

            if query.include_modified {
                for group in &device_type.service_groups {
                    let in_group: Vec<&ServiceMatch> = services
                        .iter()
                        .copied()
                        .filter(|m| m.service.service_group_key == group.key)
                        .collect();
                    if in_group.is_empty() {
                        continue;
                    }
                    results.push(self.selectable(
                        device_type,
                        id_modifier::service_group_selection(&device_type.id, &group.key),
                        &in_group,
                        &resolved,
                        query.include_device_types,
                    ));
                }
            }
        }
        Ok(results)
    }

    fn match_services<'d>(
        &self,
        device_type: &'d DeviceType,
        resolved: &[ResolvedCriterion],
        query: &SelectableQuery,
    ) -> Vec<ServiceMatch<'d>> {
        let matcher = CriteriaMatcher::new(self.forest);
        let expansion = HierarchyExpansion::from(self.config.selectable_expansion);

        let mut out = Vec::new();
        for service in &device_type.services {
            if !query.interactions.is_empty() && !query.interactions.contains(&service.interaction)
            {
                continue;
            }
            let mut options = Vec::new();
            for tuple in flatten_service(device_type, service) {
                if !tuple.path.starts_with(&query.path_prefix) {
                    continue;
                }
                let hits: Vec<usize> = resolved
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.direction() == Some(tuple.direction))
                    .filter(|(_, r)| matcher.matches(&r.criteria, &tuple, expansion))
                    .map(|(i, _)| i)
                    .collect();
                if !hits.is_empty() {
                    options.push((tuple, hits));
                }
            }
            if !options.is_empty() {
                out.push(ServiceMatch { service, options });
            }
        }
        out
    }

    fn selectable(
        &self,
        device_type: &DeviceType,
        id: String,
        services: &[&ServiceMatch],
        resolved: &[ResolvedCriterion],
        include_device_type: bool,
    ) -> DeviceTypeSelectable {
        let mut service_path_options = BTreeMap::new();
        for m in services {
            let options = m
                .options
                .iter()
                .map(|(tuple, hits)| ServicePathOption {
                    service_id: m.service.id.clone(),
                    path: tuple.path.clone(),
                    characteristic_id: tuple.characteristic_id.clone(),
                    aspect_node: self.aspect_node(&tuple.aspect_id),
                    function_id: tuple.function_id.clone(),
                    is_void: tuple.is_void,
                    value: tuple.value.clone(),
                    value_type: tuple.value_type.clone(),
                    interaction: tuple.interaction,
                    matched_criteria: hits.iter().map(|&i| resolved[i].short.clone()).collect(),
                })
                .collect();
            service_path_options.insert(m.service.id.clone(), options);
        }
        DeviceTypeSelectable {
            device_type_id: id,
            device_type: include_device_type.then(|| device_type.clone()),
            services: services.iter().map(|m| m.service.clone()).collect(),
            service_path_options,
        }
    }

    fn aspect_node(&self, aspect_id: &str) -> Option<AspectNode> {
        if aspect_id.is_empty() {
            return None;
        }
        match self.forest.enriched(aspect_id) {
            Ok(node) => Some(node),
            Err(e) => {
                tracing::debug!("No aspect node for path option: {}", e);
                None
            }
        }
    }
}
