//! Fusion de plusieurs zones en une nouvelle zone

use geo::{Area as _, MultiPolygon};
use tracing::{info, warn};

use crate::alert::{AlertSeverity, MERGE_FAILED_MESSAGE};
use crate::command::{AddOptions, AreaCommand, Command, CommandProcessor};
use crate::context::SpatialContext;
use crate::types::Area;
use crate::validate::topology::{as_multipolygon, simplify_collection, union_all};
use crate::AreaError;

/// Paramètres confirmés dans la boîte de dialogue de fusion
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Titre de la zone fusionnée
    pub title: Option<String>,

    pub description: Option<String>,

    /// Supprimer les zones d'origine
    pub replace: bool,
}

/// Calcule la zone fusionnée (non ajoutée)
pub fn merged_area(areas: &[Area], options: &MergeOptions) -> Result<Area, AreaError> {
    if areas.is_empty() {
        return Err(AreaError::MergeFailed("no areas to merge".to_string()));
    }

    let parts: Vec<MultiPolygon> = areas
        .iter()
        .filter_map(|a| a.geometry.as_ref())
        .filter_map(as_multipolygon)
        .collect();
    if parts.is_empty() {
        return Err(AreaError::MergeFailed("no polygonal geometry".to_string()));
    }

    let union = union_all(parts);
    if union.0.is_empty() || union.unsigned_area() <= 0.0 {
        return Err(AreaError::MergeFailed("union is empty".to_string()));
    }

    let names: Vec<&str> = areas.iter().map(Area::display_title).collect();
    let mut merged = Area::new(simplify_collection(union));
    merged.title = Some(
        options
            .title
            .clone()
            .unwrap_or_else(|| format!("Merge of {}", names.join(", "))),
    );
    merged.description = options.description.clone();
    merged.tags = areas
        .iter()
        .flat_map(|a| a.tags.iter().cloned())
        .fold(Vec::new(), |mut acc, tag| {
            if !acc.contains(&tag) {
                acc.push(tag);
            }
            acc
        });
    Ok(merged)
}

/// Construit la commande de fusion: ajout de la nouvelle zone, puis
/// suppression des zones d'origine si `replace`.
pub fn merge_command(
    ctx: &SpatialContext,
    areas: &[Area],
    options: &MergeOptions,
) -> Result<Command, AreaError> {
    let merged = merged_area(areas, options)?;

    let mut commands: Vec<Command> = vec![AreaCommand::add(&merged, AddOptions::default()).into()];
    if options.replace {
        commands.extend(
            areas
                .iter()
                .filter(|a| ctx.store.contains(&a.id))
                .map(|a| AreaCommand::remove(a).into()),
        );
    }

    Command::batch(commands, false).ok_or_else(|| AreaError::MergeFailed("nothing to do".to_string()))
}

/// Confirmation de la fusion: soumet la commande ou alerte l'utilisateur
pub fn merge_areas(
    ctx: &mut SpatialContext,
    processor: &mut dyn CommandProcessor,
    areas: &[Area],
    options: &MergeOptions,
) -> bool {
    let command = match merge_command(ctx, areas, options) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, areas = areas.len(), "Merge failed");
            ctx.store.alert(MERGE_FAILED_MESSAGE, AlertSeverity::Error);
            return false;
        }
    };

    let ok = processor.add_command(command, ctx);
    if ok {
        info!(areas = areas.len(), replace = options.replace, "Areas merged");
    } else {
        ctx.store.alert(MERGE_FAILED_MESSAGE, AlertSeverity::Error);
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_empty_merge_fails() {
        let err = merged_area(&[], &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, AreaError::MergeFailed(_)));
    }

    #[test]
    fn test_overlapping_merge_area() {
        let a = Area::new(polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)])
            .with_title("A");
        let b = Area::new(polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0), (x: 1.0, y: 2.0)])
            .with_title("B");
        let merged = merged_area(&[a, b], &MergeOptions::default()).unwrap();
        let geometry = merged.geometry.unwrap();
        assert!((geometry.unsigned_area() - 6.0).abs() < 1e-9);
        assert_eq!(merged.title.as_deref(), Some("Merge of A, B"));
    }
}
