//! SelectionService over an in-memory store.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use semrepo_core::{
    AspectNode, ContentVariable, DeviceType, EngineConfig, Error, EventBus, Interaction,
    MetadataStore, RepoEvent, Service, SharedStore,
};
use semrepo_selection::{AspectUsageFilter, SelectableQuery, SelectionService};
use semrepo_storage::{Catalog, MemoryStore};

use common::*;

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_catalog(Catalog {
        aspect_nodes: aspect_nodes(),
        functions: functions(),
        device_types: device_types(),
    }))
}

async fn service_over(store: Arc<MemoryStore>) -> SelectionService {
    let shared: SharedStore = store;
    SelectionService::new(shared, EngineConfig::default())
        .await
        .unwrap()
}

fn ids(nodes: &[AspectNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

/// Outdoor switch whose output reports the on state under an aspect.
fn outdoor_switch() -> DeviceType {
    DeviceType::new("dt_outdoor", "Outdoor Switch").with_service(
        Service::new("s_state", "getState", Interaction::Request).with_output(
            ContentVariable::new("on", "bool")
                .with_function(F_ON)
                .with_aspect("outside_air"),
        ),
    )
}

#[tokio::test]
async fn test_list_all_aspect_nodes() {
    let service = service_over(store()).await;
    let nodes = service.list_aspect_nodes(None).await.unwrap();
    assert_eq!(ids(&nodes), vec!["air", "inside_air", "outside_air"]);

    let air = &nodes[0];
    assert_eq!(air.child_ids, vec!["inside_air", "outside_air"]);
    assert_eq!(nodes[1].root_id, "air");
}

#[tokio::test]
async fn test_list_used_aspect_nodes() {
    let service = service_over(store()).await;

    let used = service
        .list_aspect_nodes(Some(AspectUsageFilter::default()))
        .await
        .unwrap();
    assert_eq!(ids(&used), vec!["inside_air"]);

    let with_parents = service
        .list_aspect_nodes(Some(AspectUsageFilter {
            include_descendants: true,
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(ids(&with_parents), vec!["air", "inside_air"]);
}

#[tokio::test]
async fn test_list_aspect_nodes_measuring_only() {
    let store = store();
    store.put_device_type(outdoor_switch()).await.unwrap();
    let service = service_over(store).await;

    let any = service
        .list_aspect_nodes(Some(AspectUsageFilter::default()))
        .await
        .unwrap();
    assert_eq!(ids(&any), vec!["inside_air", "outside_air"]);

    let measuring = service
        .list_aspect_nodes(Some(AspectUsageFilter {
            measuring_function_only: true,
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(ids(&measuring), vec!["inside_air"]);
}

#[tokio::test]
async fn test_list_aspect_nodes_with_used_ancestor() {
    let store = store();
    store
        .put_device_type(
            DeviceType::new("dt_air", "Air Sensor").with_service(
                Service::new("s_t", "getTemp", Interaction::Event).with_output(
                    ContentVariable::new("t", "float")
                        .with_function(F_TEMP)
                        .with_aspect("air"),
                ),
            ),
        )
        .await
        .unwrap();
    let service = service_over(store).await;

    let nodes = service
        .list_aspect_nodes(Some(AspectUsageFilter {
            include_ancestors: true,
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(ids(&nodes), vec!["air", "inside_air", "outside_air"]);
}

#[tokio::test]
async fn test_measuring_functions_of_aspect() {
    let store = store();
    store.put_device_type(outdoor_switch()).await.unwrap();
    let service = service_over(store).await;

    let inside = service
        .list_aspect_node_measuring_functions("inside_air", false, false)
        .await
        .unwrap();
    let inside: Vec<&str> = inside.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(inside, vec![F_HUM, F_TEMP]);

    let air_only = service
        .list_aspect_node_measuring_functions("air", false, false)
        .await
        .unwrap();
    assert!(air_only.is_empty());

    // The controlling function on outside_air is never listed.
    let below_air = service
        .list_aspect_node_measuring_functions("air", false, true)
        .await
        .unwrap();
    assert_eq!(below_air.len(), 2);

    let err = service
        .list_aspect_node_measuring_functions("ghost", true, true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_query_v1_and_v2() {
    let service = service_over(store()).await;
    let criteria = vec![temperature(), humidity()];

    let v1 = service
        .query_device_type_selectables(criteria.clone(), "", &[], false, false)
        .await
        .unwrap();
    let split = v1.iter().find(|s| s.device_type_id == "dt_split").unwrap();
    assert_eq!(split.service_ids(), vec!["s_x", "s_y"]);

    let v2 = service
        .query_device_type_selectables_v2(criteria, "", false, true, false)
        .await
        .unwrap();
    let split = v2.iter().find(|s| s.device_type_id == "dt_split").unwrap();
    assert!(split.services.is_empty());
}

#[tokio::test]
async fn test_query_rejects_unknown_interaction() {
    let service = service_over(store()).await;
    let err = service
        .query_device_type_selectables(vec![temperature()], "", &["push".to_string()], false, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCriteria(_)));
}

#[tokio::test]
async fn test_query_respects_visibility() {
    let service = service_over(store()).await;
    let visible: BTreeSet<String> = ["dt_split".to_string()].into_iter().collect();
    let results = service
        .query(
            &SelectableQuery::new(vec![temperature(), humidity()]),
            Some(visible),
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].device_type_id, "dt_split");
}

#[tokio::test]
async fn test_standalone_dedup() {
    let service = service_over(store()).await;
    let inside = semrepo_core::FilterCriteria::with_aspect(
        F_TEMP,
        "inside_air",
        Interaction::EventAndRequest,
    );
    let reduced = service.filter_generic_duplicate_criteria(&[temperature(), inside.clone()]);
    assert_eq!(reduced, vec![inside]);
}

#[tokio::test]
async fn test_failed_reload_keeps_snapshot() {
    let store = store();
    let service = service_over(Arc::clone(&store)).await;

    store
        .put_aspect_node(AspectNode::new("a", "A").with_parent("b"))
        .await
        .unwrap();
    store
        .put_aspect_node(AspectNode::new("b", "B").with_parent("a"))
        .await
        .unwrap();

    let err = service.reload_forest().await.unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
    assert_eq!(service.forest().len(), 3);
}

#[tokio::test]
async fn test_watch_rebuilds_on_aspect_change() {
    let store = store();
    let service = Arc::new(service_over(Arc::clone(&store)).await);
    let bus = EventBus::new();
    let handle = Arc::clone(&service).watch(&bus);

    store
        .put_aspect_node(AspectNode::new("kitchen_air", "Kitchen Air").with_parent("inside_air"))
        .await
        .unwrap();
    // Not an aspect change, ignored by the watcher.
    bus.publish(RepoEvent::device_type_updated("dt_split"));
    bus.publish(RepoEvent::aspect_node_updated("kitchen_air"));

    let forest_handle = service.forest_handle();
    tokio::time::timeout(Duration::from_secs(5), async {
        while forest_handle.generation() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let forest = service.forest();
    assert!(forest.contains("kitchen_air"));
    assert_eq!(forest.root("kitchen_air").unwrap().id, "air");

    handle.abort();
}
