//! Configuration de l'outil

use std::path::Path;

use anyhow::{Context, Result};
use areakit::menu::{LayerInfo, StaticLayers};
use areakit::{StoreSettings, ValidateSettings};
use serde::{Deserialize, Serialize};

/// Configuration principale
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Paramètres du store (sauvegarde, titres générés)
    pub store: StoreSettings,

    /// Paramètres de validation des géométries
    pub validate: ValidateSettings,

    /// Couches proposées dans "Choose Layers"
    pub layers: Vec<LayerInfo>,
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            "strict" => Self::load_embedded(include_str!("presets/strict.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: default, strict", preset),
        }
    }

    /// Nom de preset ou chemin vers un fichier JSON
    pub fn resolve(source: &str) -> Result<Self> {
        let path = Path::new(source);
        if path.exists() || source.ends_with(".json") {
            Self::load(path)
        } else {
            Self::from_preset(source)
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    pub fn layer_catalog(&self) -> StaticLayers {
        StaticLayers::new(self.layers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_parse() {
        let default = Config::from_preset("default").unwrap();
        assert_eq!(default.store.save_delay_ms, 100);
        assert!(!default.layers.is_empty());

        let strict = Config::from_preset("strict").unwrap();
        assert!(strict.validate.circle_segments > default.validate.circle_segments);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Config::from_preset("nope").is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"layers": [{"id": "a", "title": "A"}]}"#).unwrap();
        assert_eq!(config.store.temp_title_prefix, "temp area ");
        assert_eq!(config.validate.circle_segments, 64);
        assert_eq!(config.layers[0].layer_type, None);
    }
}
