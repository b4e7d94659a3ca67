//! Persistance des zones

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::types::Area;
use crate::AreaError;

/// Stockage des zones
pub trait AreaPersistence {
    fn save(&mut self, areas: &[Area]) -> Result<(), AreaError>;
    fn load(&mut self) -> Result<Vec<Area>, AreaError>;
}

/// Persistance par défaut: ne fait rien
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

impl AreaPersistence for NoopPersistence {
    fn save(&mut self, _areas: &[Area]) -> Result<(), AreaError> {
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<Area>, AreaError> {
        Ok(Vec::new())
    }
}

/// Fichier GeoJSON (FeatureCollection)
#[derive(Debug, Clone)]
pub struct GeoJsonFile {
    path: PathBuf,
}

impl GeoJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AreaPersistence for GeoJsonFile {
    fn save(&mut self, areas: &[Area]) -> Result<(), AreaError> {
        std::fs::write(&self.path, crate::geojson::write_areas(areas))?;
        debug!(path = %self.path.display(), areas = areas.len(), "Areas saved");
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<Area>, AreaError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        crate::geojson::read_areas(&content)
    }
}

/// Persistance en mémoire, clonable pour inspecter les sauvegardes
#[derive(Debug, Default, Clone)]
pub struct MemoryPersistence {
    state: Rc<RefCell<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    saved: Vec<Area>,
    save_count: usize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pré-remplit le contenu retourné par `load`
    pub fn with_areas(areas: Vec<Area>) -> Self {
        let p = Self::default();
        p.state.borrow_mut().saved = areas;
        p
    }

    pub fn save_count(&self) -> usize {
        self.state.borrow().save_count
    }

    pub fn saved(&self) -> Vec<Area> {
        self.state.borrow().saved.clone()
    }
}

impl AreaPersistence for MemoryPersistence {
    fn save(&mut self, areas: &[Area]) -> Result<(), AreaError> {
        let mut state = self.state.borrow_mut();
        state.saved = areas.to_vec();
        state.save_count += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<Area>, AreaError> {
        Ok(self.state.borrow().saved.clone())
    }
}
