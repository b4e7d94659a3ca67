//! Catalogue des couches et sous-menus temporaires "Choose Layers"

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::predicates::is_polygonal;
use super::tree::{MenuItem, MenuItemType};
use super::{ContextItem, MenuAction, MenuEvent};

pub const QUERY_GROUP: &str = "Query";
pub const EXCLUDE_GROUP: &str = "Exclude";
pub const CHOOSE_LAYERS: &str = "Choose Layers";
pub const BY_LAYER_TYPE: &str = "By Layer Type";
pub const CUSTOM_LAYERS: &str = "Custom...";

/// Source de données dont la géométrie peut être éditée directement
pub trait ModifiableSource {
    fn supports_modify(&self) -> bool;
}

/// Couche chargée
pub trait LayerSource {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn layer_type(&self) -> Option<&str>;

    /// Capacité de modification, si la source la fournit
    fn as_modifiable(&self) -> Option<&dyn ModifiableSource> {
        None
    }
}

/// Couches actives de l'application
pub trait LayerCatalog {
    fn layers(&self) -> Vec<&dyn LayerSource>;

    fn get_layer(&self, id: &str) -> Option<&dyn LayerSource> {
        self.layers().into_iter().find(|l| l.id() == id)
    }
}

/// Description statique d'une couche
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerInfo {
    pub id: String,
    pub title: String,
    #[serde(default, rename = "type")]
    pub layer_type: Option<String>,
    #[serde(default)]
    pub modifiable: bool,
}

impl LayerInfo {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            layer_type: None,
            modifiable: false,
        }
    }

    pub fn of_type(mut self, layer_type: impl Into<String>) -> Self {
        self.layer_type = Some(layer_type.into());
        self
    }

    pub fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }
}

impl ModifiableSource for LayerInfo {
    fn supports_modify(&self) -> bool {
        self.modifiable
    }
}

impl LayerSource for LayerInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn layer_type(&self) -> Option<&str> {
        self.layer_type.as_deref()
    }

    fn as_modifiable(&self) -> Option<&dyn ModifiableSource> {
        if self.modifiable {
            Some(self)
        } else {
            None
        }
    }
}

/// Catalogue figé (configuration, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticLayers {
    layers: Vec<LayerInfo>,
}

impl StaticLayers {
    pub fn new(layers: Vec<LayerInfo>) -> Self {
        Self { layers }
    }
}

impl LayerCatalog for StaticLayers {
    fn layers(&self) -> Vec<&dyn LayerSource> {
        self.layers.iter().map(|l| l as &dyn LayerSource).collect()
    }
}

/// Couches regroupées par type (couches sans type ignorées)
pub fn layers_by_type(catalog: &dyn LayerCatalog) -> BTreeMap<String, Vec<String>> {
    let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for layer in catalog.layers() {
        if let Some(t) = layer.layer_type() {
            by_type.entry(t.to_string()).or_default().push(layer.id().to_string());
        }
    }
    by_type
}

/// Reconstruit les sous-menus de choix des couches sous les groupes
/// Query et Exclude. Ils ne sont présents que pour un contexte polygonal.
pub fn update_temporary_items(root: &mut MenuItem, items: &[ContextItem], catalog: &dyn LayerCatalog) {
    for group in [QUERY_GROUP, EXCLUDE_GROUP] {
        if let Some(g) = root.find_mut(group) {
            g.remove_child(CHOOSE_LAYERS);
        }
    }

    if !is_polygonal(items) {
        return;
    }

    let by_type = layers_by_type(catalog);
    for (group, event) in [(QUERY_GROUP, MenuEvent::Add), (EXCLUDE_GROUP, MenuEvent::AddExclude)] {
        let Some(g) = root.find_mut(group) else {
            continue;
        };

        let mut choose = MenuItem::submenu(CHOOSE_LAYERS, 100);
        if !by_type.is_empty() {
            let mut by_type_menu = MenuItem::submenu(BY_LAYER_TYPE, 0);
            for (i, (layer_type, ids)) in by_type.iter().enumerate() {
                by_type_menu.add_child(
                    MenuItem::new(
                        MenuItemType::Item,
                        format!("{} ({})", layer_type, ids.len()),
                    )
                    .action(MenuAction::Scoped {
                        event,
                        layer_ids: ids.clone(),
                    })
                    .sort(i as i32),
                );
            }
            choose.add_child(by_type_menu);
        }
        choose.add_child(
            MenuItem::new(MenuItemType::Item, CUSTOM_LAYERS)
                .action(MenuAction::CustomLayers { event })
                .sort(1),
        );
        g.add_child(choose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::default_menu;
    use geo::{polygon, Point};

    fn catalog() -> StaticLayers {
        StaticLayers::new(vec![
            LayerInfo::new("l1", "Roads").of_type("Feature"),
            LayerInfo::new("l2", "Rivers").of_type("Feature"),
            LayerInfo::new("l3", "Heatmap").of_type("Heatmap"),
            LayerInfo::new("l4", "Basemap"),
        ])
    }

    #[test]
    fn test_layers_by_type() {
        let by_type = layers_by_type(&catalog());
        assert_eq!(by_type.len(), 2);
        assert_eq!(by_type["Feature"], vec!["l1", "l2"]);
    }

    #[test]
    fn test_choose_layers_rebuilt_for_polygons() {
        let mut root = default_menu();
        let items = vec![ContextItem::from_geometry(
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
        )];

        update_temporary_items(&mut root, &items, &catalog());
        update_temporary_items(&mut root, &items, &catalog());

        let query = root.find(QUERY_GROUP).unwrap();
        let choose: Vec<_> = query.children.iter().filter(|c| c.label == CHOOSE_LAYERS).collect();
        assert_eq!(choose.len(), 1);
        assert!(root.find("Feature (2)").is_some());
        assert!(root.find("Heatmap (1)").is_some());

        let custom = choose[0].find(CUSTOM_LAYERS).unwrap();
        assert_eq!(custom.action, Some(MenuAction::CustomLayers { event: MenuEvent::Add }));
    }

    #[test]
    fn test_choose_layers_removed_for_points() {
        let mut root = default_menu();
        let poly = vec![ContextItem::from_geometry(
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
        )];
        update_temporary_items(&mut root, &poly, &catalog());

        let points = vec![ContextItem::from_geometry(Point::new(0.0, 0.0).into())];
        update_temporary_items(&mut root, &points, &catalog());
        assert!(root.find(CHOOSE_LAYERS).is_none());
    }
}
