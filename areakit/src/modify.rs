//! Modification de la géométrie d'une zone existante
//!
//! Soit par remplacement direct (édition interactive), soit par une opération
//! booléenne entre la zone cible et une forme dessinée.

use geo::{Area as _, BooleanOps, Geometry};
use tracing::warn;

use crate::alert::{AlertSeverity, INVALID_AREA_MESSAGE};
use crate::command::{AreaCommand, Command, CommandProcessor};
use crate::context::SpatialContext;
use crate::validate::topology::{as_multipolygon, simplify_collection};
use crate::AreaError;

/// Opération booléenne appliquée à la zone cible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOp {
    Add,
    Remove,
    Intersect,
}

/// Demande confirmée par la boîte de dialogue de modification
#[derive(Debug, Clone)]
pub enum ModifyRequest {
    /// Nouvelle géométrie issue de l'édition interactive
    Replace { target_id: String, geometry: Geometry },
    /// Forme dessinée combinée avec la cible
    Boolean {
        target_id: String,
        tool: Geometry,
        op: ModifyOp,
    },
}

impl ModifyRequest {
    pub fn target_id(&self) -> &str {
        match self {
            Self::Replace { target_id, .. } | Self::Boolean { target_id, .. } => target_id,
        }
    }
}

/// Applique l'opération booléenne
pub fn modified_geometry(target: &Geometry, tool: &Geometry, op: ModifyOp) -> Result<Geometry, AreaError> {
    let (Some(target), Some(tool)) = (as_multipolygon(target), as_multipolygon(tool)) else {
        return Err(AreaError::ModifyFailed("geometries must be polygonal".to_string()));
    };

    let result = match op {
        ModifyOp::Add => target.union(&tool),
        ModifyOp::Remove => target.difference(&tool),
        ModifyOp::Intersect => target.intersection(&tool),
    };

    if result.0.is_empty() || result.unsigned_area() <= 0.0 {
        return Err(AreaError::ModifyFailed(format!("{op:?} produced an empty area")));
    }
    Ok(simplify_collection(result))
}

/// Construit la commande de modification
pub fn modify_command(ctx: &SpatialContext, request: &ModifyRequest) -> Result<Command, AreaError> {
    let target_id = request.target_id();
    let Some(target) = ctx.store.get(target_id) else {
        return Err(AreaError::NotFound(target_id.to_string()));
    };

    let geometry = match request {
        ModifyRequest::Replace { geometry, .. } => geometry.clone(),
        ModifyRequest::Boolean { tool, op, .. } => {
            let current = target
                .geometry
                .as_ref()
                .ok_or_else(|| AreaError::invalid_geometry(target_id, "null geometry"))?;
            modified_geometry(current, tool, *op)?
        }
    };

    Ok(AreaCommand::modify(target, geometry).into())
}

/// Confirmation de la modification: soumet la commande ou alerte l'utilisateur
pub fn modify_area(
    ctx: &mut SpatialContext,
    processor: &mut dyn CommandProcessor,
    request: &ModifyRequest,
) -> bool {
    match modify_command(ctx, request) {
        Ok(command) => processor.add_command(command, ctx),
        Err(e) => {
            warn!(area_id = %request.target_id(), error = %e, "Modify failed");
            ctx.store.alert(INVALID_AREA_MESSAGE, AlertSeverity::Warning);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, size: f64) -> Geometry {
        Geometry::Polygon(polygon![
            (x: x, y: 0.0),
            (x: x + size, y: 0.0),
            (x: x + size, y: size),
            (x: x, y: size),
        ])
    }

    #[test]
    fn test_boolean_ops() {
        let target = square(0.0, 2.0);
        let tool = square(1.0, 2.0);
        let add = modified_geometry(&target, &tool, ModifyOp::Add).unwrap();
        let remove = modified_geometry(&target, &tool, ModifyOp::Remove).unwrap();
        let intersect = modified_geometry(&target, &tool, ModifyOp::Intersect).unwrap();
        assert!((add.unsigned_area() - 6.0).abs() < 1e-9);
        assert!((remove.unsigned_area() - 2.0).abs() < 1e-9);
        assert!((intersect.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_intersection_fails() {
        let err = modified_geometry(&square(0.0, 1.0), &square(5.0, 1.0), ModifyOp::Intersect).unwrap_err();
        assert!(matches!(err, AreaError::ModifyFailed(_)));
    }
}
