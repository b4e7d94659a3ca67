//! Collaborateur de rendu cartographique

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use geo::Geometry;

use crate::projection::EPSG_4326;
use crate::types::AreaStyle;

/// Interface de la carte consommée par le store
pub trait MapView {
    /// CRS de la carte
    fn epsg(&self) -> u32 {
        EPSG_4326
    }

    fn contains_feature(&self, id: &str) -> bool;

    /// Ajoute une feature (géométrie déjà projetée dans le CRS de la carte)
    fn add_feature(&mut self, id: &str, geometry: &Geometry, style: AreaStyle);

    fn remove_feature(&mut self, id: &str);

    fn set_feature_style(&mut self, id: &str, style: AreaStyle);

    /// Demande un rafraîchissement de l'affichage
    fn redraw(&mut self) {}
}

/// Carte en mémoire; les clones partagent le même état
#[derive(Debug, Clone)]
pub struct MemoryMap {
    epsg: u32,
    state: Rc<RefCell<MemoryMapState>>,
}

#[derive(Debug, Default)]
struct MemoryMapState {
    features: BTreeMap<String, (Geometry, AreaStyle)>,
    redraws: usize,
    adds: usize,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new(EPSG_4326)
    }
}

impl MemoryMap {
    pub fn new(epsg: u32) -> Self {
        Self {
            epsg,
            state: Rc::new(RefCell::new(MemoryMapState::default())),
        }
    }

    pub fn feature_ids(&self) -> Vec<String> {
        self.state.borrow().features.keys().cloned().collect()
    }

    pub fn geometry(&self, id: &str) -> Option<Geometry> {
        self.state.borrow().features.get(id).map(|(g, _)| g.clone())
    }

    pub fn style(&self, id: &str) -> Option<AreaStyle> {
        self.state.borrow().features.get(id).map(|(_, s)| *s)
    }

    pub fn redraw_count(&self) -> usize {
        self.state.borrow().redraws
    }

    /// Nombre total d'ajouts (détecte les insertions en double)
    pub fn add_count(&self) -> usize {
        self.state.borrow().adds
    }
}

impl MapView for MemoryMap {
    fn epsg(&self) -> u32 {
        self.epsg
    }

    fn contains_feature(&self, id: &str) -> bool {
        self.state.borrow().features.contains_key(id)
    }

    fn add_feature(&mut self, id: &str, geometry: &Geometry, style: AreaStyle) {
        let mut state = self.state.borrow_mut();
        state.adds += 1;
        state.features.insert(id.to_string(), (geometry.clone(), style));
    }

    fn remove_feature(&mut self, id: &str) {
        self.state.borrow_mut().features.remove(id);
    }

    fn set_feature_style(&mut self, id: &str, style: AreaStyle) {
        if let Some(entry) = self.state.borrow_mut().features.get_mut(id) {
            entry.1 = style;
        }
    }

    fn redraw(&mut self) {
        self.state.borrow_mut().redraws += 1;
    }
}
