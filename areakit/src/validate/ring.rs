//! Normalisation des anneaux (fermeture, doublons, sens, longitudes)

use geo::orient::{Direction, Orient};
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};

/// Tolérance de comparaison des coordonnées
const TOLERANCE: f64 = 1e-9;

/// Compare deux coordonnées avec tolérance
pub fn coords_equal(a: Coord, b: Coord) -> bool {
    (a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE
}

/// Supprime les doublons consécutifs et ferme l'anneau
pub fn clean_ring(ring: &LineString) -> LineString {
    let mut coords: Vec<Coord> = Vec::with_capacity(ring.0.len() + 1);
    for &c in ring.0.iter() {
        if !c.x.is_finite() || !c.y.is_finite() {
            continue;
        }
        if coords.last().map_or(true, |&last| !coords_equal(last, c)) {
            coords.push(c);
        }
    }

    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if coords.len() > 1 && !coords_equal(first, last) {
            coords.push(first);
        }
    }

    LineString::new(coords)
}

/// Normalise une géométrie polygonale en place.
///
/// Extérieurs anti-horaires, trous horaires; en coordonnées géographiques les
/// longitudes sont rendues continues à travers l'antiméridien puis recentrées
/// dans [-180, 180].
pub fn normalize_geometry(geometry: &mut Geometry, geographic: bool) {
    match geometry {
        Geometry::Polygon(p) => {
            if geographic {
                unwrap_polygon(p);
            }
            *p = p.orient(Direction::Default);
        }
        Geometry::MultiPolygon(mp) => {
            if geographic {
                for p in mp.0.iter_mut() {
                    unwrap_polygon(p);
                }
            }
            *mp = MultiPolygon::new(mp.0.iter().map(|p| p.orient(Direction::Default)).collect());
        }
        _ => {}
    }
}

fn unwrap_polygon(polygon: &mut Polygon) {
    polygon.exterior_mut(unwrap_longitudes);
    let shift = recenter_shift(polygon.exterior());
    if shift != 0.0 {
        polygon.exterior_mut(|ring| shift_ring(ring, shift));
    }
    polygon.interiors_mut(|rings| {
        for ring in rings.iter_mut() {
            unwrap_longitudes(ring);
            if shift != 0.0 {
                shift_ring(ring, shift);
            }
        }
    });
}

/// Rend les longitudes consécutives continues (saut > 180° corrigé de ±360°)
fn unwrap_longitudes(ring: &mut LineString) {
    for i in 1..ring.0.len() {
        let previous = ring.0[i - 1].x;
        let current = &mut ring.0[i].x;
        let delta = *current - previous;
        if delta.abs() > 180.0 {
            *current = previous + (delta + 180.0).rem_euclid(360.0) - 180.0;
        }
    }
}

/// Décalage (multiple de 360) ramenant le centre de l'anneau dans [-180, 180]
fn recenter_shift(ring: &LineString) -> f64 {
    let (min_x, max_x) = ring
        .0
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.x), hi.max(c.x))
        });
    if !min_x.is_finite() {
        return 0.0;
    }
    let center = (min_x + max_x) / 2.0;
    if center.abs() <= 180.0 {
        return 0.0;
    }
    -360.0 * ((center + 180.0) / 360.0).floor()
}

fn shift_ring(ring: &mut LineString, dx: f64) {
    for c in ring.0.iter_mut() {
        c.x += dx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    #[test]
    fn test_clean_ring_closes_and_dedupes() {
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let cleaned = clean_ring(&ring);
        assert_eq!(cleaned.0.len(), 4);
        assert!(coords_equal(cleaned.0[0], cleaned.0[3]));
    }

    #[test]
    fn test_antimeridian_crossing_is_unwrapped() {
        let mut geometry = Geometry::Polygon(polygon![
            (x: 179.0, y: 0.0),
            (x: -179.0, y: 0.0),
            (x: -179.0, y: 1.0),
            (x: 179.0, y: 1.0),
        ]);
        normalize_geometry(&mut geometry, true);

        // Largeur réelle: 2 degrés, pas 358
        let Geometry::Polygon(p) = &geometry else {
            panic!("expected polygon");
        };
        assert!((p.unsigned_area() - 2.0).abs() < 1e-9);
        assert!(p.exterior().0.iter().all(|c| c.x.abs() <= 181.0));
    }

    #[test]
    fn test_far_wrapped_ring_is_recentered() {
        let mut geometry = Geometry::Polygon(polygon![
            (x: 1080.0 + 10.0, y: 0.0),
            (x: 1080.0 + 11.0, y: 0.0),
            (x: 1080.0 + 11.0, y: 1.0),
            (x: 1080.0 + 10.0, y: 1.0),
        ]);
        normalize_geometry(&mut geometry, true);
        let Geometry::Polygon(p) = &geometry else {
            panic!("expected polygon");
        };
        assert!(p.exterior().0.iter().all(|c| (10.0..=11.0).contains(&c.x)));
    }

    #[test]
    fn test_huge_longitudes_terminate() {
        // 360 est absorbé par l'arrondi à cette magnitude
        let mut geometry = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1e20, y: 0.0),
            (x: 1e20, y: 1.0),
            (x: 0.0, y: 1.0),
        ]);
        normalize_geometry(&mut geometry, true);
        let Geometry::Polygon(p) = &geometry else {
            panic!("expected polygon");
        };
        assert!(p.exterior().0.iter().all(|c| c.x.is_finite()));
    }

    #[test]
    fn test_planar_coordinates_untouched() {
        let mut geometry = Geometry::Polygon(polygon![
            (x: 500.0, y: 0.0),
            (x: 510.0, y: 0.0),
            (x: 510.0, y: 10.0),
        ]);
        normalize_geometry(&mut geometry, false);
        let Geometry::Polygon(p) = &geometry else {
            panic!("expected polygon");
        };
        assert_eq!(p.exterior().0[0].x, 500.0);
    }
}
