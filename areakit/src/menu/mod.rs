//! Menu contextuel spatial
//!
//! Le menu est construit une fois ([`default_menu`]); à chaque ouverture le
//! contexte est normalisé en [`ContextItem`], les sous-menus temporaires sont
//! reconstruits et la visibilité de chaque élément recalculée. Les événements
//! sont traduits en commandes par [`dispatch::SpatialMenu`].

pub mod dispatch;
pub mod layers;
pub mod predicates;
pub mod tree;

use std::fmt;
use std::str::FromStr;

use geo::Geometry;

use crate::store::AreaStore;
use crate::types::Area;
use crate::AreaError;

pub use dispatch::{
    AreaDialogs, DialogRequest, FeatureSelection, MenuOutcome, ModifyLaunch, Recorder,
    SearchProvider, SelectionRequest, SpatialMenu,
};
pub use layers::{LayerCatalog, LayerInfo, LayerSource, ModifiableSource, StaticLayers};
pub use predicates::{MenuEnv, Visibility};
pub use tree::{MenuItem, MenuItemType};

/// Événements du menu spatial (valeurs échangées avec l'interface)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuEvent {
    Load,
    Add,
    Exclude,
    AddExclude,
    Select,
    SelectExclusive,
    Deselect,
    Remove,
    FeatureInfo,
    ModifyArea,
    MergeAreas,
    Export,
    Enable,
    Disable,
    RemoveArea,
    Save,
    Edit,
    Search,
}

impl MenuEvent {
    pub const ALL: [MenuEvent; 18] = [
        MenuEvent::Load,
        MenuEvent::Add,
        MenuEvent::Exclude,
        MenuEvent::AddExclude,
        MenuEvent::Select,
        MenuEvent::SelectExclusive,
        MenuEvent::Deselect,
        MenuEvent::Remove,
        MenuEvent::FeatureInfo,
        MenuEvent::ModifyArea,
        MenuEvent::MergeAreas,
        MenuEvent::Export,
        MenuEvent::Enable,
        MenuEvent::Disable,
        MenuEvent::RemoveArea,
        MenuEvent::Save,
        MenuEvent::Edit,
        MenuEvent::Search,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MenuEvent::Load => "load",
            MenuEvent::Add => "add",
            MenuEvent::Exclude => "exclude",
            MenuEvent::AddExclude => "add_exclude",
            MenuEvent::Select => "select",
            MenuEvent::SelectExclusive => "selectExclusive",
            MenuEvent::Deselect => "deselect",
            MenuEvent::Remove => "remove",
            MenuEvent::FeatureInfo => "featureInfo",
            MenuEvent::ModifyArea => "area:modify",
            MenuEvent::MergeAreas => "area:merge",
            MenuEvent::Export => "export",
            MenuEvent::Enable => "enable",
            MenuEvent::Disable => "disable",
            MenuEvent::RemoveArea => "area:removeArea",
            MenuEvent::Save => "save",
            MenuEvent::Edit => "edit",
            MenuEvent::Search => "area:search",
        }
    }

    /// Événements de requête (inclusion/exclusion)
    pub fn is_query(self) -> bool {
        matches!(
            self,
            MenuEvent::Load | MenuEvent::Add | MenuEvent::Exclude | MenuEvent::AddExclude
        )
    }
}

impl fmt::Display for MenuEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuEvent {
    type Err = AreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MenuEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| AreaError::UnknownEvent(s.to_string()))
    }
}

/// Action portée par un élément de menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Event(MenuEvent),
    /// Événement restreint à un ensemble de couches
    Scoped {
        event: MenuEvent,
        layer_ids: Vec<String>,
    },
    /// Choix des couches par l'utilisateur avant l'événement
    CustomLayers { event: MenuEvent },
}

impl MenuAction {
    pub fn event(&self) -> MenuEvent {
        match self {
            MenuAction::Event(e) => *e,
            MenuAction::Scoped { event, .. } | MenuAction::CustomLayers { event } => *event,
        }
    }
}

/// Élément du contexte, sous forme normalisée
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextItem {
    pub feature: Option<Area>,
    /// Géométrie propre à l'élément (sinon celle de l'entité)
    pub geometry: Option<Geometry>,
    pub layer_id: Option<String>,
}

impl ContextItem {
    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Default::default()
        }
    }

    pub fn from_area(area: Area) -> Self {
        Self {
            feature: Some(area),
            ..Default::default()
        }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry
            .as_ref()
            .or_else(|| self.feature.as_ref().and_then(|f| f.geometry.as_ref()))
    }

    /// Identifiant de zone de l'entité, s'il est attribué
    pub fn area_id(&self) -> Option<&str> {
        self.feature
            .as_ref()
            .map(|f| f.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Cible brute d'ouverture du menu
#[derive(Debug, Clone)]
pub enum MenuTarget {
    /// Élément déjà normalisé (entité de couche, forme)
    Item(ContextItem),
    /// Noeud de l'arbre des zones
    AreaNode(String),
    /// Noeud d'une couche de dessin
    DrawingNode(Area),
}

/// Normalise les cibles; un noeud de zone absent du store est ignoré
pub fn normalize_context(targets: Vec<MenuTarget>, store: &AreaStore) -> Vec<ContextItem> {
    targets
        .into_iter()
        .filter_map(|target| match target {
            MenuTarget::Item(item) => Some(item),
            MenuTarget::AreaNode(id) => store.get(&id).cloned().map(ContextItem::from_area),
            MenuTarget::DrawingNode(area) => Some(ContextItem::from_area(area)),
        })
        .collect()
}

/// Arbre par défaut du menu spatial
pub fn default_menu() -> MenuItem {
    use Visibility::*;

    MenuItem::root().with_children(vec![
        MenuItem::group(layers::QUERY_GROUP, 0).with_children(vec![
            MenuItem::event("Load", MenuEvent::Load)
                .tooltip("Query all layers with this area, replacing the current query")
                .visible_if(&[Polygonal])
                .sort(0),
            MenuItem::event("Add", MenuEvent::Add)
                .tooltip("Add this area to the current query")
                .visible_if(&[Polygonal])
                .sort(1),
        ]),
        MenuItem::group(layers::EXCLUDE_GROUP, 1).with_children(vec![
            MenuItem::event("Exclude", MenuEvent::Exclude)
                .tooltip("Exclude this area, replacing the current exclusions")
                .visible_if(&[Polygonal])
                .sort(0),
            MenuItem::event("Add Exclude", MenuEvent::AddExclude)
                .tooltip("Add this area to the current exclusions")
                .visible_if(&[Polygonal])
                .sort(1),
        ]),
        MenuItem::group("Select", 2).with_children(vec![
            MenuItem::event("Select", MenuEvent::Select)
                .visible_if(&[Polygonal])
                .sort(0),
            MenuItem::event("Select Exclusive", MenuEvent::SelectExclusive)
                .visible_if(&[Polygonal])
                .sort(1),
            MenuItem::event("Deselect", MenuEvent::Deselect)
                .visible_if(&[Polygonal])
                .sort(2),
            MenuItem::event("Remove Features", MenuEvent::Remove)
                .visible_if(&[Polygonal])
                .sort(3),
        ]),
        MenuItem::group("Area", 3).with_children(vec![
            MenuItem::event("Save as Area", MenuEvent::Save)
                .visible_if(&[CanSave])
                .sort(0),
            MenuItem::event("Edit Area", MenuEvent::Edit)
                .visible_if(&[Single, InAreaManager])
                .sort(1),
            MenuItem::event("Enable Area", MenuEvent::Enable)
                .visible_if(&[InAreaManager, NotShown])
                .sort(2),
            MenuItem::event("Disable Area", MenuEvent::Disable)
                .visible_if(&[InAreaManager, Shown])
                .sort(3),
            MenuItem::event("Modify Area", MenuEvent::ModifyArea)
                .tooltip("Modify the geometry of the area")
                .visible_if(&[CanModifyGeometry])
                .sort(4),
            MenuItem::event("Merge Areas", MenuEvent::MergeAreas)
                .visible_if(&[InAreaManager, Multiple])
                .sort(5),
            MenuItem::event("Remove Area", MenuEvent::RemoveArea)
                .visible_if(&[InAreaManager])
                .sort(6),
            MenuItem::event("Export Areas", MenuEvent::Export)
                .visible_if(&[InAreaManager])
                .sort(7),
            MenuItem::separator(8),
            MenuItem::event("Feature Info", MenuEvent::FeatureInfo)
                .visible_if(&[InLayer])
                .sort(9),
            MenuItem::event("Search Area", MenuEvent::Search)
                .visible_if(&[Searchable])
                .sort(10),
        ]),
    ])
}
