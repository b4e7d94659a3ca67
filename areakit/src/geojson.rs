//! Sérialisation des zones en GeoJSON et export (GeoJSON, WKB)

use std::collections::BTreeMap;

use geo::Geometry;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use geozero::{CoordDimensions, ToJson, ToWkb};
use serde_json::Value;

use crate::types::Area;
use crate::AreaError;

/// Propriétés réservées, relues dans les champs typés de `Area`
const RESERVED: &[&str] = &[
    "title",
    "description",
    "tags",
    "temporary",
    "shown",
    "normalized",
    "radius",
    "originalGeometry",
];

/// Convertit une zone en feature GeoJSON
pub fn area_to_feature(area: &Area) -> Feature {
    let mut properties = JsonObject::new();
    for (key, value) in &area.properties {
        properties.insert(key.clone(), value.clone());
    }
    if let Some(title) = &area.title {
        properties.insert("title".to_string(), Value::from(title.as_str()));
    }
    if let Some(description) = &area.description {
        properties.insert("description".to_string(), Value::from(description.as_str()));
    }
    if !area.tags.is_empty() {
        properties.insert("tags".to_string(), Value::from(area.tags.clone()));
    }
    if let Some(radius) = area.radius {
        properties.insert("radius".to_string(), Value::from(radius));
    }
    if let Some(original) = &area.original_geometry {
        let geometry = geojson::Geometry::new(geojson::Value::from(original));
        if let Ok(value) = serde_json::to_value(geometry) {
            properties.insert("originalGeometry".to_string(), value);
        }
    }
    properties.insert("temporary".to_string(), Value::from(area.temporary));
    properties.insert("shown".to_string(), Value::from(area.shown));
    properties.insert("normalized".to_string(), Value::from(area.normalized));

    Feature {
        bbox: None,
        geometry: area
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
        id: (!area.id.is_empty()).then(|| Id::String(area.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convertit une feature GeoJSON en zone (non validée)
pub fn feature_to_area(feature: Feature) -> Result<Area, AreaError> {
    let geometry = match feature.geometry {
        Some(g) => Some(Geometry::<f64>::try_from(g)?),
        None => None,
    };

    let id = match feature.id {
        Some(Id::String(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => String::new(),
    };

    let mut props: BTreeMap<String, Value> = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .collect();

    let string_prop = |key: &str| props.get(key).and_then(Value::as_str).map(str::to_string);
    let title = string_prop("title");
    let description = string_prop("description");

    let tags = match props.get("tags") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let original_geometry = match props.get("originalGeometry") {
        Some(value) => {
            let g: geojson::Geometry = serde_json::from_value(value.clone())?;
            Some(Geometry::<f64>::try_from(g)?)
        }
        None => None,
    };

    let flag = |key: &str, default: bool| props.get(key).and_then(Value::as_bool).unwrap_or(default);
    let temporary = flag("temporary", false);
    let shown = flag("shown", true);
    let normalized = flag("normalized", false);
    let radius = props.get("radius").and_then(Value::as_f64);

    props.retain(|key, _| !RESERVED.contains(&key.as_str()));

    Ok(Area {
        id,
        title,
        description,
        tags,
        geometry,
        original_geometry,
        radius,
        properties: props,
        temporary,
        shown,
        normalized,
        ..Default::default()
    })
}

/// Lit des zones depuis un document GeoJSON (FeatureCollection, Feature ou Geometry)
pub fn read_areas(json: &str) -> Result<Vec<Area>, AreaError> {
    match json.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().map(feature_to_area).collect(),
        GeoJson::Feature(f) => Ok(vec![feature_to_area(f)?]),
        GeoJson::Geometry(g) => Ok(vec![Area::new(Geometry::<f64>::try_from(g)?)]),
    }
}

/// Écrit des zones en FeatureCollection GeoJSON
pub fn write_areas<'a>(areas: impl IntoIterator<Item = &'a Area>) -> String {
    FeatureCollection {
        bbox: None,
        features: areas.into_iter().map(area_to_feature).collect(),
        foreign_members: None,
    }
    .to_string()
}

/// Géométrie seule en GeoJSON (via geozero)
pub fn geometry_to_json(geometry: &Geometry) -> Result<String, AreaError> {
    Ok(geometry.to_json()?)
}

/// Géométrie en WKB hexadécimal (via geozero)
pub fn geometry_to_wkb_hex(geometry: &Geometry) -> Result<String, AreaError> {
    let wkb = geometry.to_wkb(CoordDimensions::xy())?;
    Ok(hex::encode(wkb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> Geometry {
        Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)])
    }

    #[test]
    fn test_area_feature_roundtrip_keeps_fields() {
        let mut area = Area::new(square()).with_id("a1").with_title("Zone A");
        area.tags = vec!["x".to_string(), "y".to_string()];
        area.temporary = true;
        area.shown = false;
        area.normalized = true;
        area.properties.insert("color".to_string(), Value::from("red"));

        let json = write_areas([&area]);
        let back = read_areas(&json).unwrap();

        assert_eq!(back.len(), 1);
        assert_eq!(back[0], area);
    }

    #[test]
    fn test_read_bare_geometry() {
        let areas = read_areas(r#"{"type":"Point","coordinates":[1.0,2.0]}"#).unwrap();
        assert_eq!(areas.len(), 1);
        assert!(areas[0].id.is_empty());
    }

    #[test]
    fn test_numeric_id_and_string_tags() {
        let json = r#"{"type":"Feature","id":7,"geometry":null,"properties":{"tags":"a, b","name":"N"}}"#;
        let area = read_areas(json).unwrap().remove(0);
        assert_eq!(area.id, "7");
        assert_eq!(area.tags, vec!["a", "b"]);
        assert_eq!(area.name(), Some("N"));
        assert!(area.geometry.is_none());
    }

    #[test]
    fn test_wkb_hex_export() {
        let hex = geometry_to_wkb_hex(&square()).unwrap();
        // Little endian, type 3 (Polygon)
        assert!(hex.starts_with("0103000000"));
    }

    #[test]
    fn test_geometry_json_export() {
        let json = geometry_to_json(&square()).unwrap();
        assert!(json.contains("Polygon"));
    }
}
