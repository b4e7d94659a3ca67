//! Types de données pour le crate areakit

use std::collections::BTreeMap;

use geo::Geometry;
use serde::{Deserialize, Serialize};

/// Identifiant de couche joker: l'entrée s'applique à toutes les couches
pub const ALL_LAYERS: &str = "*";

/// Une zone nommée servant à restreindre les requêtes spatiales
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    /// Identifiant unique (vide tant que le store ne l'a pas attribué)
    pub id: String,

    /// Nom affiché (`temp area N` par défaut)
    pub title: Option<String>,

    /// Description libre
    pub description: Option<String>,

    /// Tags utilisateur
    pub tags: Vec<String>,

    /// Géométrie validée et normalisée (Polygon ou MultiPolygon une fois acceptée)
    pub geometry: Option<Geometry>,

    /// Géométrie d'origine (avant validation), conservée pour l'affichage
    pub original_geometry: Option<Geometry>,

    /// Rayon en mètres pour les zones circulaires dessinées depuis un point
    pub radius: Option<f64>,

    /// Attributs additionnels (clé -> valeur JSON)
    pub properties: BTreeMap<String, serde_json::Value>,

    /// Zone nommée automatiquement, pas encore sauvegardée explicitement
    pub temporary: bool,

    /// Zone affichée / active sur la carte
    pub shown: bool,

    /// Les anneaux ont déjà été normalisés (évite de renormaliser à chaque chargement)
    pub normalized: bool,

    /// Style courant calculé depuis le registre de requêtes
    pub style: AreaStyle,
}

impl Default for Area {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: None,
            description: None,
            tags: Vec::new(),
            geometry: None,
            original_geometry: None,
            radius: None,
            properties: BTreeMap::new(),
            temporary: false,
            shown: true,
            normalized: false,
            style: AreaStyle::Default,
        }
    }
}

impl Area {
    /// Crée une zone depuis une géométrie brute
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attribut `name` hérité d'un import, s'il existe
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(|v| v.as_str())
    }

    /// Titre affiché, avec repli sur l'identifiant
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    /// Vrai si la géométrie est un Polygon ou un MultiPolygon
    pub fn is_polygonal(&self) -> bool {
        self.geometry.as_ref().map_or(false, is_polygonal)
    }
}

/// Style visuel d'une zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaStyle {
    /// Zone non utilisée par une requête
    #[default]
    Default,
    /// Zone d'inclusion ("ne montrer que l'intérieur")
    Inclusion,
    /// Zone d'exclusion ("masquer l'intérieur")
    Exclusion,
    /// Copie transitoire mise en surbrillance
    Highlight,
}

/// Association entre une couche, une zone et un drapeau inclusion/exclusion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryEntry {
    /// Identifiant de couche ou `*`
    pub layer_id: String,

    /// Identifiant de zone
    pub area_id: String,

    /// Groupe de filtres (None = tous)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_group: Option<String>,

    /// true = inclusion, false = exclusion
    pub include_area: bool,

    /// Entrée niée (exclue des recherches par défaut)
    #[serde(default)]
    pub negate: bool,
}

impl QueryEntry {
    pub fn new(layer_id: impl Into<String>, area_id: impl Into<String>, include_area: bool) -> Self {
        Self {
            layer_id: layer_id.into(),
            area_id: area_id.into(),
            filter_group: None,
            include_area,
            negate: false,
        }
    }
}

/// Vrai pour Polygon et MultiPolygon
pub fn is_polygonal(geometry: &Geometry) -> bool {
    matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
}

/// Nom du type de géométrie, pour les logs et les erreurs
pub fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
