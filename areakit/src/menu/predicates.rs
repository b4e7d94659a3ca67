//! Prédicats de visibilité des éléments du menu spatial

use super::layers::LayerCatalog;
use super::ContextItem;
use crate::store::AreaStore;
use crate::types::is_polygonal as geometry_is_polygonal;

/// Environnement d'évaluation des prédicats
pub struct MenuEnv<'a> {
    pub items: &'a [ContextItem],
    pub store: &'a AreaStore,
    pub layers: &'a dyn LayerCatalog,
    /// Au moins un fournisseur de recherche géographique est enregistré
    pub geo_search: bool,
}

/// Prédicat de visibilité
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Polygonal,
    Single,
    Multiple,
    InLayer,
    InAreaManager,
    CanSave,
    CanModifyGeometry,
    Shown,
    NotShown,
    Searchable,
}

impl Visibility {
    pub fn evaluate(self, env: &MenuEnv<'_>) -> bool {
        match self {
            Visibility::Polygonal => is_polygonal(env.items),
            Visibility::Single => has_single(env.items),
            Visibility::Multiple => has_multiple(env.items),
            Visibility::InLayer => is_in_layer(env),
            Visibility::InAreaManager => in_area_manager(env.items, env.store),
            Visibility::CanSave => can_save(env.items, env.store),
            Visibility::CanModifyGeometry => can_modify_geometry(env),
            Visibility::Shown => shown_state(env.items, env.store, true),
            Visibility::NotShown => shown_state(env.items, env.store, false),
            Visibility::Searchable => env.geo_search && is_polygonal(env.items),
        }
    }
}

/// Tous les éléments ont une géométrie polygonale
pub fn is_polygonal(items: &[ContextItem]) -> bool {
    !items.is_empty()
        && items
            .iter()
            .all(|i| i.geometry().map_or(false, geometry_is_polygonal))
}

pub fn has_single(items: &[ContextItem]) -> bool {
    items.len() == 1
}

pub fn has_multiple(items: &[ContextItem]) -> bool {
    items.len() > 1
}

/// Tous les éléments sont des entités d'une couche chargée, pas encore des zones
pub fn is_in_layer(env: &MenuEnv<'_>) -> bool {
    !env.items.is_empty()
        && env.items.iter().all(|item| {
            let from_layer = item
                .layer_id
                .as_deref()
                .map_or(false, |id| env.layers.get_layer(id).is_some());
            from_layer && item.feature.is_some() && !item_in_store(item, env.store)
        })
}

/// Tous les éléments sont des zones polygonales du store
pub fn in_area_manager(items: &[ContextItem], store: &AreaStore) -> bool {
    is_polygonal(items) && items.iter().all(|item| item_in_store(item, store))
}

/// Un seul polygone, qui n'est pas déjà une zone
pub fn can_save(items: &[ContextItem], store: &AreaStore) -> bool {
    has_single(items) && is_polygonal(items) && !in_area_manager(items, store)
}

/// Modification géométrique possible pour l'unique élément du contexte.
///
/// Une couche source modifiable suffit. Sinon il faut un autre polygone du
/// store pour servir d'outil (ou de cible pour une forme dessinée).
pub fn can_modify_geometry(env: &MenuEnv<'_>) -> bool {
    let [item] = env.items else {
        return false;
    };

    let modifiable = item
        .layer_id
        .as_deref()
        .and_then(|id| env.layers.get_layer(id))
        .and_then(|layer| layer.as_modifiable())
        .map_or(false, |source| source.supports_modify());
    if modifiable {
        return true;
    }

    if !is_polygonal(env.items) {
        return false;
    }

    let polygonal_areas = env
        .store
        .get_all()
        .into_iter()
        .filter(|a| a.is_polygonal())
        .count();

    if item_in_store(item, env.store) {
        polygonal_areas >= 2
    } else {
        polygonal_areas >= 1
    }
}

fn shown_state(items: &[ContextItem], store: &AreaStore, shown: bool) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.area_id()
                .and_then(|id| store.get(id))
                .map_or(false, |a| a.shown == shown)
        })
}

fn item_in_store(item: &ContextItem, store: &AreaStore) -> bool {
    item.area_id().map_or(false, |id| store.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::layers::{LayerInfo, StaticLayers};
    use crate::types::Area;
    use geo::{line_string, polygon, Geometry, Point};

    fn square(x: f64) -> Geometry {
        polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0)].into()
    }

    fn env<'a>(items: &'a [ContextItem], store: &'a AreaStore, layers: &'a StaticLayers) -> MenuEnv<'a> {
        MenuEnv {
            items,
            store,
            layers,
            geo_search: false,
        }
    }

    #[test]
    fn test_polygonal_requires_all_items() {
        let items = vec![
            ContextItem::from_geometry(square(0.0)),
            ContextItem::from_geometry(Point::new(0.0, 0.0).into()),
        ];
        assert!(!is_polygonal(&items));
        assert!(is_polygonal(&items[..1]));
        assert!(!is_polygonal(&[]));
    }

    #[test]
    fn test_drawn_polygon_visibility() {
        let store = AreaStore::default();
        let layers = StaticLayers::default();
        let items = vec![ContextItem::from_geometry(square(0.0))];
        let env = env(&items, &store, &layers);

        assert!(Visibility::CanSave.evaluate(&env));
        assert!(!Visibility::InAreaManager.evaluate(&env));
        assert!(!Visibility::InLayer.evaluate(&env));
        assert!(!Visibility::CanModifyGeometry.evaluate(&env));
    }

    #[test]
    fn test_store_area_visibility() {
        let mut store = AreaStore::default();
        assert!(store.add(Area::new(square(0.0)).with_id("a")));
        let items = vec![ContextItem::from_area(store.get("a").unwrap().clone())];
        let layers = StaticLayers::default();
        let env = env(&items, &store, &layers);

        assert!(Visibility::InAreaManager.evaluate(&env));
        assert!(Visibility::Shown.evaluate(&env));
        assert!(!Visibility::NotShown.evaluate(&env));
        assert!(!Visibility::CanSave.evaluate(&env));
        // seule zone polygonale du store
        assert!(!Visibility::CanModifyGeometry.evaluate(&env));
    }

    #[test]
    fn test_modify_needs_a_tool_area() {
        let mut store = AreaStore::default();
        assert!(store.add(Area::new(square(0.0)).with_id("a")));
        assert!(store.add(Area::new(square(5.0)).with_id("b")));
        let items = vec![ContextItem::from_area(store.get("a").unwrap().clone())];
        let layers = StaticLayers::default();
        assert!(can_modify_geometry(&env(&items, &store, &layers)));

        let line = vec![ContextItem::from_geometry(
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
        )];
        assert!(!can_modify_geometry(&env(&line, &store, &layers)));
    }

    #[test]
    fn test_modifiable_layer_source() {
        let store = AreaStore::default();
        let layers = StaticLayers::new(vec![LayerInfo::new("parcels", "Parcels").modifiable(true)]);
        let items = vec![ContextItem {
            feature: Some(Area::new(square(0.0)).with_id("f1")),
            geometry: None,
            layer_id: Some("parcels".to_string()),
        }];
        let env = env(&items, &store, &layers);
        assert!(Visibility::CanModifyGeometry.evaluate(&env));
        assert!(Visibility::InLayer.evaluate(&env));
    }
}
