//! Réparation topologique (auto-intersections, anneaux dégénérés)
//!
//! Un anneau auto-intersecté est découpé en boucles simples aux points
//! d'intersection, puis les boucles sont réunies. Les trous sont traités de
//! la même façon et soustraits du résultat.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BooleanOps, Coord, Geometry, Line, LineString, MultiPolygon, Polygon};

use super::ring::{clean_ring, coords_equal};

/// Aire minimale d'une boucle conservée
const MIN_LOOP_AREA: f64 = 1e-12;

/// Répare une géométrie polygonale.
///
/// Retourne un Polygon si le résultat n'a qu'une composante, sinon un MultiPolygon.
pub fn repair(geometry: &Geometry) -> Result<Geometry, String> {
    let repaired = match geometry {
        Geometry::Polygon(p) => repair_polygon(p)?,
        Geometry::MultiPolygon(mp) => {
            let mut parts = Vec::with_capacity(mp.0.len());
            for p in mp.0.iter() {
                parts.push(repair_polygon(p)?);
            }
            union_all(parts)
        }
        Geometry::Rect(r) => repair_polygon(&r.to_polygon())?,
        Geometry::Triangle(t) => repair_polygon(&t.to_polygon())?,
        other => {
            return Err(format!(
                "{} is not polygonal",
                crate::types::geometry_type_name(other)
            ))
        }
    };

    let mut polygons: Vec<Polygon> = repaired
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > MIN_LOOP_AREA)
        .collect();

    match polygons.len() {
        0 => Err("geometry is empty after repair".to_string()),
        1 => Ok(Geometry::Polygon(polygons.remove(0))),
        _ => Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
    }
}

/// Vrai si l'anneau n'a aucune auto-intersection
pub fn is_simple(ring: &LineString) -> bool {
    self_intersections(ring).is_empty()
}

/// Répare un polygone seul
pub fn repair_polygon(polygon: &Polygon) -> Result<MultiPolygon, String> {
    let exterior = clean_ring(polygon.exterior());
    if exterior.0.len() < 4 {
        return Err(format!(
            "exterior ring has {} distinct points, need at least 3",
            exterior.0.len().saturating_sub(1)
        ));
    }

    let interiors: Vec<LineString> = polygon
        .interiors()
        .iter()
        .map(clean_ring)
        .filter(|r| r.0.len() >= 4)
        .collect();

    let all_simple = is_simple(&exterior) && interiors.iter().all(is_simple);
    if all_simple {
        let candidate = Polygon::new(exterior, interiors);
        if candidate.unsigned_area() <= MIN_LOOP_AREA {
            return Err("polygon has no area".to_string());
        }
        return Ok(MultiPolygon::new(vec![candidate]));
    }

    let shell = union_all(
        split_ring(&exterior)
            .into_iter()
            .map(|r| MultiPolygon::new(vec![Polygon::new(r, vec![])]))
            .collect(),
    );

    let holes = union_all(
        interiors
            .iter()
            .flat_map(split_ring)
            .map(|r| MultiPolygon::new(vec![Polygon::new(r, vec![])]))
            .collect(),
    );

    if holes.0.is_empty() {
        Ok(shell)
    } else {
        Ok(shell.difference(&holes))
    }
}

/// Union d'une liste de multipolygones
pub fn union_all(parts: Vec<MultiPolygon>) -> MultiPolygon {
    let mut iter = parts.into_iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(vec![]);
    };
    iter.fold(first, |acc, next| acc.union(&next))
}

/// Vue MultiPolygon d'une géométrie polygonale
pub fn as_multipolygon(geometry: &Geometry) -> Option<MultiPolygon> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

/// Polygon si une seule composante, sinon MultiPolygon
pub fn simplify_collection(mut mp: MultiPolygon) -> Geometry {
    if mp.0.len() == 1 {
        Geometry::Polygon(mp.0.remove(0))
    } else {
        Geometry::MultiPolygon(mp)
    }
}

/// Points d'auto-intersection d'un anneau fermé: (segment i, segment j, point)
pub fn self_intersections(ring: &LineString) -> Vec<(usize, usize, Coord)> {
    let segments: Vec<Line> = ring.lines().collect();
    let n = segments.len();
    let mut found = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(segments[i], segments[j]) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    if adjacent {
                        continue;
                    }
                    found.push((i, j, intersection));
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    // Deux segments adjacents colinéaires qui se recouvrent: pointe
                    if adjacent && coords_equal(intersection.start, intersection.end) {
                        continue;
                    }
                    found.push((i, j, intersection.start));
                }
                None => {}
            }
        }
    }

    found
}

/// Découpe un anneau en boucles simples
pub fn split_ring(ring: &LineString) -> Vec<LineString> {
    let noded = node_ring(ring);
    let mut loops = Vec::new();
    let mut stack: Vec<Coord> = Vec::with_capacity(noded.len());

    // Le dernier point (fermeture) est ignoré: il rebouclera sur le premier
    let open_len = noded.len().saturating_sub(1);
    for &c in noded.iter().take(open_len) {
        if let Some(pos) = stack.iter().position(|&p| coords_equal(p, c)) {
            let mut closed = stack.split_off(pos);
            closed.push(c);
            stack.push(c);
            push_loop(&mut loops, closed);
        } else {
            stack.push(c);
        }
    }

    if let Some(&first) = stack.first() {
        stack.push(first);
        push_loop(&mut loops, stack);
    }

    loops
}

fn push_loop(loops: &mut Vec<LineString>, coords: Vec<Coord>) {
    if coords.len() < 4 {
        return;
    }
    let ring = LineString::new(coords);
    if Polygon::new(ring.clone(), vec![]).unsigned_area() > MIN_LOOP_AREA {
        loops.push(ring);
    }
}

/// Insère les points d'intersection dans l'anneau
fn node_ring(ring: &LineString) -> Vec<Coord> {
    let segments: Vec<Line> = ring.lines().collect();
    let mut splits: Vec<Vec<Coord>> = vec![Vec::new(); segments.len()];

    for (i, seg) in segments.iter().enumerate() {
        for (j, other) in segments.iter().enumerate() {
            if i == j {
                continue;
            }
            let candidates: Vec<Coord> = match line_intersection(*seg, *other) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => vec![intersection],
                Some(LineIntersection::Collinear { intersection }) => {
                    vec![intersection.start, intersection.end]
                }
                None => continue,
            };
            for c in candidates {
                if !coords_equal(c, seg.start) && !coords_equal(c, seg.end) {
                    splits[i].push(c);
                }
            }
        }
    }

    let mut noded = Vec::with_capacity(ring.0.len() + splits.iter().map(Vec::len).sum::<usize>());
    for (seg, mut points) in segments.iter().zip(splits) {
        noded.push(seg.start);
        points.sort_by(|a, b| {
            distance2(seg.start, *a)
                .partial_cmp(&distance2(seg.start, *b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        points.dedup_by(|a, b| coords_equal(*a, *b));
        noded.extend(points);
    }
    if let Some(last) = segments.last() {
        noded.push(last.end);
    }
    noded
}

fn distance2(a: Coord, b: Coord) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}
