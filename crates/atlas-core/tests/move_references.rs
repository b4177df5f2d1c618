//! End-to-end scenario: moving a feature source repoints the map that
//! draws it, without disturbing anything else in the repository.

use atlas_core::model::TypedResource;
use atlas_core::{
    move_resource_with_references, CancelFlag, MemoryStore, NullProgress, ResourceGraphNode,
    ResourceStore, WorkStatus,
};

const ROADS_FS: &str = "Library://Data/Roads.FeatureSource";
const ROADS_FS_MOVED: &str = "Library://Data2/Roads.FeatureSource";
const CITY_MAP: &str = "Library://Data/Map.MapDefinition";

fn seeded_repository() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .put_xml(
            ROADS_FS,
            r#"<FeatureSource>
  <Provider>OSGeo.SDF</Provider>
  <Parameter>
    <Name>File</Name>
    <Value>%MG_DATA_FILE_PATH%Roads.sdf</Value>
  </Parameter>
</FeatureSource>"#,
        )
        .unwrap();
    store
        .put_xml(
            CITY_MAP,
            r#"<MapDefinition>
  <Name>City</Name>
  <CoordinateSystem>WGS84</CoordinateSystem>
  <MapLayer>
    <Name>Roads</Name>
    <ResourceId>Library://Data/Roads.FeatureSource</ResourceId>
    <LegendLabel>Roads</LegendLabel>
  </MapLayer>
  <MapLayer>
    <Name>Parks</Name>
    <ResourceId>Library://Other/Parks.LayerDefinition</ResourceId>
  </MapLayer>
</MapDefinition>"#,
        )
        .unwrap();
    store
}

#[test]
fn moving_a_feature_source_repoints_the_referencing_map() {
    let store = seeded_repository();

    let outcome = move_resource_with_references(
        &store,
        ROADS_FS,
        ROADS_FS_MOVED,
        &mut NullProgress,
        &CancelFlag::new(),
    )
    .unwrap();

    assert!(outcome.completed());
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].path, CITY_MAP);
    assert_eq!(outcome.items[0].status, WorkStatus::Success);

    // The document moved.
    assert!(!store.resource_exists(ROADS_FS).unwrap());
    assert!(store.resource_exists(ROADS_FS_MOVED).unwrap());

    // The map still lives at its own path and now references the new
    // identifier; the unrelated layer is untouched.
    let node = store.get(CITY_MAP).unwrap();
    let ResourceGraphNode::Typed(TypedResource::MapDefinition(map)) = node else {
        panic!("expected the map to decode as a typed model");
    };
    assert_eq!(map.layers[0].resource_id, ROADS_FS_MOVED);
    assert_eq!(
        map.layers[1].resource_id,
        "Library://Other/Parks.LayerDefinition"
    );

    // The stale identifier is no longer referenced anywhere.
    assert!(store.enumerate_references(ROADS_FS).unwrap().is_empty());
    assert_eq!(
        store.enumerate_references(ROADS_FS_MOVED).unwrap(),
        vec![CITY_MAP.to_string()]
    );
}
