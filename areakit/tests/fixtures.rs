//! Import des fixtures GeoJSON dans le store

use std::fs;

use areakit::geojson::read_areas;
use areakit::validate::is_valid;
use areakit::{AreaStore, ValidateSettings};
use geo::{BoundingRect, Geometry};

fn fixture_paths() -> Vec<std::path::PathBuf> {
    let pattern = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/*.geojson");
    let mut paths: Vec<_> = glob::glob(pattern)
        .expect("valid glob pattern")
        .filter_map(Result::ok)
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_all_fixtures_import_as_polygons() {
    let paths = fixture_paths();
    assert!(paths.len() >= 4, "fixtures missing: {:?}", paths);

    for path in paths {
        let json = fs::read_to_string(&path).unwrap();
        let areas = read_areas(&json).unwrap();
        assert!(!areas.is_empty(), "{} has no feature", path.display());

        let mut store = AreaStore::default();
        let added = store.bulk_add(areas.clone(), true);
        assert_eq!(added, areas.len(), "{} rejected a feature", path.display());

        for area in store.get_all() {
            assert!(area.is_polygonal(), "{}: {}", path.display(), area.display_title());
            assert!(is_valid(area, &ValidateSettings::default()));
        }
    }
}

#[test]
fn test_parcels_metadata() {
    let json = fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/parcels.geojson"
    ))
    .unwrap();
    let mut store = AreaStore::default();
    store.bulk_add(read_areas(&json).unwrap(), true);

    let north = store.get("parcel-1").unwrap();
    assert_eq!(north.display_title(), "North field");
    assert_eq!(north.tags, vec!["farm", "north"]);

    let south = store.get("42").unwrap();
    assert_eq!(south.display_title(), "South field");
    assert!(!south.temporary);
    assert_eq!(south.tags, vec!["farm", "south"]);
}

#[test]
fn test_dateline_polygon_stays_compact() {
    let json = fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/track.geojson"
    ))
    .unwrap();
    let mut store = AreaStore::default();
    store.bulk_add(read_areas(&json).unwrap(), true);

    let dateline = store
        .get_all()
        .into_iter()
        .find(|a| a.display_title() == "Dateline")
        .unwrap();
    let Some(Geometry::Polygon(polygon)) = &dateline.geometry else {
        panic!("expected a polygon");
    };
    let rect = polygon.bounding_rect().unwrap();
    assert!(rect.width() < 2.0, "width {}", rect.width());
}
