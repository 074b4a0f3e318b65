//! Async facade over a metadata store.
//!
//! The service owns the current aspect forest snapshot. Each call loads what
//! it needs from the store, takes one snapshot and runs the synchronous
//! engine over both.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use semrepo_core::{
    not_found_err, AspectNode, DeviceType, DeviceTypeFilter, EngineConfig, EventBus,
    FilterCriteria, Function, FunctionKind, Interaction, RepoEvent, Result, SharedStore,
};

use crate::dedup;
use crate::flatten::{flatten_service, Direction};
use crate::forest::{AspectForest, ForestHandle};
use crate::resolve::validate_criteria;
use crate::selectables::{DeviceTypeSelectable, MatchMode, SelectableQuery, SelectableQueryEngine};

/// Restricts aspect listings to aspects used by device types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectUsageFilter {
    /// Only count output variables bound to a measuring function.
    pub measuring_function_only: bool,
    /// Also list aspects with a used ancestor.
    pub include_ancestors: bool,
    /// Also list aspects with a used descendant.
    pub include_descendants: bool,
}

pub struct SelectionService {
    store: SharedStore,
    forest: Arc<ForestHandle>,
    config: EngineConfig,
}

impl SelectionService {
    /// Load the aspect catalog and build the first forest snapshot.
    pub async fn new(store: SharedStore, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let nodes = store.load_all_aspect_nodes().await?;
        let forest = AspectForest::build(nodes)?;
        tracing::info!("Selection service started with {} aspect nodes", forest.len());
        Ok(Self {
            store,
            forest: Arc::new(ForestHandle::new(forest)),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn forest(&self) -> Arc<AspectForest> {
        self.forest.snapshot()
    }

    pub fn forest_handle(&self) -> Arc<ForestHandle> {
        Arc::clone(&self.forest)
    }

    /// Rebuild the forest from the store. The previous snapshot stays in
    /// place when the new one fails to build.
    pub async fn reload_forest(&self) -> Result<Arc<AspectForest>> {
        let nodes = self.store.load_all_aspect_nodes().await?;
        self.forest.rebuild(nodes)
    }

    /// Aspect nodes with derived fields, sorted by id.
    pub async fn list_aspect_nodes(
        &self,
        filter: Option<AspectUsageFilter>,
    ) -> Result<Vec<AspectNode>> {
        let forest = self.forest();
        let Some(filter) = filter else {
            return forest.enriched_nodes();
        };

        let device_types = self
            .store
            .load_device_types_for_selectable_query(&DeviceTypeFilter::all())
            .await?;
        let mut kinds = KindCache::default();
        let mut used: HashSet<String> = HashSet::new();
        for (function_id, aspect_id) in output_usages(&device_types) {
            if filter.measuring_function_only
                && kinds.kind(&self.store, &function_id).await? != Some(FunctionKind::Measuring)
            {
                continue;
            }
            used.insert(aspect_id);
        }

        let mut listed = Vec::new();
        for node in forest.enriched_nodes()? {
            let include = used.contains(&node.id)
                || (filter.include_descendants
                    && node.descendent_ids.iter().any(|d| used.contains(d)))
                || (filter.include_ancestors && node.ancestor_ids.iter().any(|a| used.contains(a)));
            if include {
                listed.push(node);
            }
        }
        Ok(listed)
    }

    /// Measuring functions used on output variables of the aspect (and
    /// optionally its relatives), sorted by id.
    pub async fn list_aspect_node_measuring_functions(
        &self,
        aspect_id: &str,
        include_ancestors: bool,
        include_descendants: bool,
    ) -> Result<Vec<Function>> {
        let forest = self.forest();
        if !forest.contains(aspect_id) {
            return Err(not_found_err!("aspect node {}", aspect_id));
        }
        let mut targets: HashSet<&str> = HashSet::from([aspect_id]);
        if include_ancestors {
            targets.extend(forest.ancestors(aspect_id)?.into_iter().map(|n| n.id.as_str()));
        }
        if include_descendants {
            targets.extend(forest.descendants(aspect_id)?.into_iter().map(|n| n.id.as_str()));
        }

        let device_types = self
            .store
            .load_device_types_for_selectable_query(&DeviceTypeFilter::all())
            .await?;
        let function_ids: BTreeSet<String> = output_usages(&device_types)
            .into_iter()
            .filter(|(_, aspect)| targets.contains(aspect.as_str()))
            .map(|(function, _)| function)
            .collect();

        let mut functions = Vec::new();
        for id in function_ids {
            match self.store.load_function(&id).await? {
                Some(function) if function.is_measuring() => functions.push(function),
                Some(_) => {}
                None => tracing::warn!("Function {} used on aspect {} is not in the store", id, aspect_id),
            }
        }
        Ok(functions)
    }

    /// Any-match selectable query. `interactions` is the service
    /// interaction allow-list; empty allows all.
    pub async fn query_device_type_selectables(
        &self,
        criteria: Vec<FilterCriteria>,
        path_prefix: &str,
        interactions: &[String],
        include_modified: bool,
        include_device_types: bool,
    ) -> Result<Vec<DeviceTypeSelectable>> {
        let interactions = interactions
            .iter()
            .map(|s| s.parse::<Interaction>())
            .collect::<Result<Vec<_>>>()?;
        let query = SelectableQuery::new(criteria)
            .with_path_prefix(path_prefix)
            .with_interactions(interactions)
            .with_modified(include_modified)
            .with_device_types(include_device_types);
        self.query(&query, None).await
    }

    pub async fn query_device_type_selectables_v2(
        &self,
        criteria: Vec<FilterCriteria>,
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
        let query = SelectableQuery::new(criteria)
            .with_path_prefix(path_prefix)
            .with_modified(include_modified)
            .with_device_types(include_device_types)
            .with_mode(mode);
        self.query(&query, None).await
    }

    /// Run a query over the device types visible to the caller.
    /// `visible_ids` of `None` means unrestricted.
    pub async fn query(
        &self,
        query: &SelectableQuery,
        visible_ids: Option<BTreeSet<String>>,
    ) -> Result<Vec<DeviceTypeSelectable>> {
        if query.criteria.is_empty() {
            return Ok(Vec::new());
        }
        validate_criteria(&query.criteria, &self.config)?;
        let forest = self.forest();

        let function_ids: BTreeSet<&str> =
            query.criteria.iter().map(|c| c.function_id.as_str()).collect();
        let mut functions: HashMap<String, Function> = HashMap::new();
        for id in &function_ids {
            if let Some(function) = self.store.load_function(id).await? {
                functions.insert(function.id.clone(), function);
            }
        }

        let mut filter = DeviceTypeFilter::with_functions(function_ids.iter().copied());
        filter.visible_ids = visible_ids;
        let device_types = self
            .store
            .load_device_types_for_selectable_query(&filter)
            .await?;

        let engine = SelectableQueryEngine::new(&forest, &functions, &self.config);
        let results = engine.query(&device_types, query)?;
        tracing::debug!(
            "Selectable query returned {} of {} candidates",
            results.len(),
            device_types.len()
        );
        Ok(results)
    }

    pub fn filter_generic_duplicate_criteria(
        &self,
        criteria: &[FilterCriteria],
    ) -> Vec<FilterCriteria> {
        dedup::filter_generic_duplicate_criteria(&self.forest(), criteria)
    }

    /// Rebuild the forest whenever an aspect node changes, or when events
    /// were missed. The task ends when the bus closes.
    pub fn watch(self: Arc<Self>, event_bus: &EventBus) -> JoinHandle<()> {
        let mut rx = event_bus.subscribe_filtered(RepoEvent::is_aspect_change);
        tokio::spawn(async move {
            while let Some(received) = rx.recv_or_lagged().await {
                match &received {
                    Some((event, _)) => {
                        tracing::debug!("{} for {}", event.type_name(), event.entity_id())
                    }
                    None => tracing::warn!("Missed repository events, rebuilding aspect forest"),
                }
                if let Err(e) = self.reload_forest().await {
                    tracing::error!("Aspect forest rebuild failed, keeping previous snapshot: {}", e);
                }
            }
            tracing::debug!("Event bus closed, aspect forest watcher stopped");
        })
    }
}

/// `(function_id, aspect_id)` of every output variable with both set.
fn output_usages(device_types: &[DeviceType]) -> Vec<(String, String)> {
    let mut usages = Vec::new();
    for device_type in device_types {
        for service in &device_type.services {
            for tuple in flatten_service(device_type, service) {
                if tuple.direction == Direction::Output && !tuple.aspect_id.is_empty() {
                    usages.push((tuple.function_id, tuple.aspect_id));
                }
            }
        }
    }
    usages
}

/// Function kinds looked up once per query.
#[derive(Default)]
struct KindCache {
    kinds: HashMap<String, Option<FunctionKind>>,
}

impl KindCache {
    async fn kind(&mut self, store: &SharedStore, function_id: &str) -> Result<Option<FunctionKind>> {
        if let Some(kind) = self.kinds.get(function_id) {
            return Ok(*kind);
        }
        let kind = match store.load_function(function_id).await? {
            Some(function) => Some(function.rdf_type),
            None => FunctionKind::from_id(function_id),
        };
        self.kinds.insert(function_id.to_string(), kind);
        Ok(kind)
    }
}
