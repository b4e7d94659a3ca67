//! Fichier d'espace de travail: zones + entrées de requête

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use areakit::geojson::{area_to_feature, feature_to_area};
use areakit::store::persist::MemoryPersistence;
use areakit::{Area, AreaStore, InMemoryLedger, QueryLedger, RecordedAlerts, SpatialContext};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;

/// Contenu sérialisé du fichier
#[derive(Debug, Deserialize, Serialize)]
struct StateFile {
    areas: FeatureCollection,
    #[serde(default)]
    ledger: InMemoryLedger,
}

/// Espace de travail chargé en mémoire
pub struct Workspace {
    path: PathBuf,
    pub ctx: SpatialContext,
    pub alerts: RecordedAlerts,
}

impl Workspace {
    /// Ouvre l'espace de travail; un fichier absent donne un espace vide
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let alerts = RecordedAlerts::new();

        let (areas, mut ledger) = if path.exists() {
            let content = std::fs::read_to_string(path)
                .context(format!("Failed to read state file: {}", path.display()))?;
            let state: StateFile =
                serde_json::from_str(&content).context("Failed to parse state JSON")?;
            let areas = state
                .areas
                .features
                .into_iter()
                .map(feature_to_area)
                .collect::<Result<Vec<Area>, _>>()
                .context("Invalid area in state file")?;
            (areas, state.ledger)
        } else {
            debug!(path = %path.display(), "No state file, starting empty");
            (Vec::new(), InMemoryLedger::new())
        };

        for layer in &config.layers {
            ledger.set_layer(layer.id.clone(), layer.title.clone());
        }

        let mut store = AreaStore::new(config.store.clone(), config.validate.clone())
            .with_persistence(MemoryPersistence::with_areas(areas))
            .with_alerts(alerts.clone());
        let loaded = store.load().context("Failed to load areas")?;
        store.take_events();
        info!(path = %path.display(), areas = loaded, "Workspace opened");

        Ok(Self {
            path: path.to_path_buf(),
            ctx: SpatialContext::new(store, ledger),
            alerts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Écrit l'état courant (zones dans l'ordre du store, registre complet)
    pub fn save(&mut self) -> Result<()> {
        let mut ledger = InMemoryLedger::new();
        for (id, label) in self.ctx.ledger.layer_set() {
            ledger.set_layer(id, label);
        }
        ledger.add_entries(&self.ctx.ledger.get_entries(None, None, None, true));

        let state = StateFile {
            areas: FeatureCollection {
                bbox: None,
                features: self.ctx.store.get_all().into_iter().map(area_to_feature).collect(),
                foreign_members: None,
            },
            ledger,
        };

        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.path, json)
            .context(format!("Failed to write state file: {}", self.path.display()))?;
        debug!(path = %self.path.display(), areas = self.ctx.store.len(), "Workspace saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn temp_state(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("areakit-state-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_state_is_empty() {
        let path = temp_state("missing");
        let _ = std::fs::remove_file(&path);
        let ws = Workspace::open(&path, &Config::default()).unwrap();
        assert!(ws.ctx.store.is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let path = temp_state("roundtrip");
        let config = Config::from_preset("default").unwrap();

        let mut ws = Workspace::open(&path, &config).unwrap();
        let area = Area::new(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)])
            .with_id("a")
            .with_title("Triangle");
        assert!(ws.ctx.store.add(area));
        ws.ctx.ledger.add_entry("roads", "a", None, false);
        ws.save().unwrap();

        let reopened = Workspace::open(&path, &config).unwrap();
        assert_eq!(reopened.ctx.store.get("a").unwrap().display_title(), "Triangle");
        assert!(reopened.ctx.ledger.is_exclusion("a"));
        assert!(reopened.ctx.ledger.layer_set().contains_key("parcels"));

        let _ = std::fs::remove_file(&path);
    }
}
