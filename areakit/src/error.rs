//! Types d'erreurs pour le crate areakit

use thiserror::Error;

/// Erreurs pouvant survenir lors de la gestion des zones
#[derive(Debug, Error)]
pub enum AreaError {
    /// Géométrie absente, vide ou non réparable
    #[error("Invalid geometry for {area_id}: {reason}")]
    InvalidGeometry { area_id: String, reason: String },

    /// Type de géométrie non convertible en polygone
    #[error("Unsupported geometry type for {area_id}: {geometry_type}")]
    UnsupportedGeometry {
        area_id: String,
        geometry_type: String,
    },

    /// Fusion impossible (liste vide ou union vide)
    #[error("Merging areas failed: {0}")]
    MergeFailed(String),

    /// Modification booléenne impossible
    #[error("Modifying area failed: {0}")]
    ModifyFailed(String),

    /// Commande appelée hors séquence (ex: revert avant execute)
    #[error("Command '{title}' cannot {action} from state {state}")]
    CommandState {
        title: String,
        action: &'static str,
        state: String,
    },

    /// Menu ouvert sans contexte
    #[error("Menu context is empty")]
    EmptyContext,

    /// Type d'événement de menu inconnu
    #[error("Unknown menu event: {0}")]
    UnknownEvent(String),

    /// Zone introuvable dans le store
    #[error("Area not found: {0}")]
    NotFound(String),

    /// Erreur d'I/O lors de la persistance
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Erreur de conversion GeoJSON
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Erreur d'export (WKB, GeoJSON via geozero)
    #[error("Export error: {0}")]
    Export(String),
}

impl AreaError {
    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(area_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            area_id: area_id.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de type de géométrie non supporté
    pub fn unsupported(area_id: impl Into<String>, geometry_type: impl Into<String>) -> Self {
        Self::UnsupportedGeometry {
            area_id: area_id.into(),
            geometry_type: geometry_type.into(),
        }
    }

    /// Vrai pour les erreurs de validation (signalées à l'utilisateur)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeometry { .. } | Self::UnsupportedGeometry { .. }
        )
    }
}

impl From<geozero::error::GeozeroError> for AreaError {
    fn from(e: geozero::error::GeozeroError) -> Self {
        Self::Export(e.to_string())
    }
}
