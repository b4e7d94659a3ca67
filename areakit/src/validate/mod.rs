//! Validation et normalisation des géométries de zones
//!
//! Une zone n'est acceptée que si sa géométrie est (ou devient) un Polygon
//! ou un MultiPolygon valide:
//! - Polygon/MultiPolygon: réparation topologique (auto-intersections)
//! - autres types: conversion en polygone équivalent (cercle, buffer)
//! - normalisation des anneaux (sens, longitudes) sur la géométrie finale

pub mod convert;
pub mod ring;
pub mod topology;

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{CoordsIter, Geometry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{geometry_type_name, is_polygonal, Area};
use crate::AreaError;

/// Longitude maximale acceptée en entrée (un tour complet de part et d'autre)
pub const MAX_LONGITUDE: f64 = 540.0;

/// Paramètres de validation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidateSettings {
    /// Nombre de segments pour approximer un cercle
    pub circle_segments: usize,

    /// Distance de buffer (unités de la géométrie) appliquée aux lignes ouvertes
    pub line_buffer: f64,

    /// Les coordonnées sont en degrés (active la gestion de l'antiméridien)
    pub geographic: bool,
}

impl Default for ValidateSettings {
    fn default() -> Self {
        Self {
            circle_segments: 64,
            line_buffer: 0.0001,
            geographic: true,
        }
    }
}

/// Valide une zone et remplace sa géométrie par la version corrigée.
///
/// En cas d'échec la zone n'est pas modifiée et l'appelant ne doit pas la stocker.
/// Les paniques de la bibliothèque géométrique sont interceptées et traitées
/// comme une géométrie invalide.
pub fn validate(area: &mut Area, settings: &ValidateSettings) -> Result<(), AreaError> {
    let Some(geometry) = area.geometry.as_ref() else {
        return Err(AreaError::invalid_geometry(&area.id, "null geometry"));
    };

    let geometry_type = geometry_type_name(geometry);
    let outcome = catch_unwind(AssertUnwindSafe(|| corrected_geometries(area, settings)));

    let (mut geometry, original) = match outcome {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            warn!(area_id = %area.id, geometry_type, error = %e, "Area geometry rejected");
            return Err(e);
        }
        Err(_) => {
            warn!(area_id = %area.id, geometry_type, "Geometry library failed while validating area");
            return Err(AreaError::invalid_geometry(
                &area.id,
                format!("unexpected failure while validating {geometry_type}"),
            ));
        }
    };

    if !area.normalized {
        ring::normalize_geometry(&mut geometry, settings.geographic);
    }

    area.geometry = Some(geometry);
    area.original_geometry = original;
    area.normalized = true;
    Ok(())
}

/// Vrai si la zone passerait la validation (sans la modifier)
pub fn is_valid(area: &Area, settings: &ValidateSettings) -> bool {
    let mut probe = area.clone();
    validate(&mut probe, settings).is_ok()
}

/// Calcule la géométrie corrigée et la géométrie d'affichage
fn corrected_geometries(
    area: &Area,
    settings: &ValidateSettings,
) -> Result<(Geometry, Option<Geometry>), AreaError> {
    let Some(geometry) = area.geometry.as_ref() else {
        return Err(AreaError::invalid_geometry(&area.id, "null geometry"));
    };

    if settings.geographic {
        if let Some(x) = geometry.coords_iter().map(|c| c.x).find(|x| x.abs() > MAX_LONGITUDE) {
            return Err(AreaError::invalid_geometry(
                &area.id,
                format!("longitude {x} out of range"),
            ));
        }
    }

    if !is_polygonal(geometry) {
        let polygon = convert::to_polygon(geometry, area.radius, settings)
            .map_err(|e| match e {
                AreaError::UnsupportedGeometry { geometry_type, .. } => {
                    AreaError::unsupported(&area.id, geometry_type)
                }
                other => other,
            })?;
        let repaired = topology::repair(&polygon)
            .map_err(|reason| AreaError::invalid_geometry(&area.id, reason))?;
        return Ok((repaired, None));
    }

    let repaired =
        topology::repair(geometry).map_err(|reason| AreaError::invalid_geometry(&area.id, reason))?;

    // La géométrie d'origine est réparée indépendamment, repli sur la géométrie corrigée
    let original = match area.original_geometry.as_ref() {
        Some(original) => match topology::repair(original) {
            Ok(fixed) => Some(fixed),
            Err(reason) => {
                debug!(area_id = %area.id, reason = %reason, "Original geometry not repairable, using corrected geometry");
                Some(repaired.clone())
            }
        },
        None => None,
    };

    Ok((repaired, original))
}
