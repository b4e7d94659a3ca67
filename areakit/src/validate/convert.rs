//! Conversion des géométries non polygonales en polygones équivalents
//!
//! - Point + rayon: cercle (géodésique en coordonnées géographiques)
//! - LineString fermée: polygone
//! - LineString ouverte: buffer (union des capsules de chaque segment)

use geo::{
    BooleanOps, ConvexHull, Coord, Geometry, HaversineDestination, LineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};

use super::ring::coords_equal;
use super::topology::union_all;
use super::ValidateSettings;
use crate::types::{geometry_type_name, is_polygonal};
use crate::AreaError;

/// Convertit une géométrie en Polygon/MultiPolygon
pub fn to_polygon(
    geometry: &Geometry,
    radius: Option<f64>,
    settings: &ValidateSettings,
) -> Result<Geometry, AreaError> {
    let unsupported = || AreaError::unsupported("", geometry_type_name(geometry));

    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(geometry.clone()),
        Geometry::Rect(r) => Ok(Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => Ok(Geometry::Polygon(t.to_polygon())),
        Geometry::Point(p) => match radius {
            Some(r) if r > 0.0 && r.is_finite() => Ok(Geometry::Polygon(circle(*p, r, settings))),
            _ => Err(unsupported()),
        },
        Geometry::Line(l) => {
            let ls = LineString::new(vec![l.start, l.end]);
            buffer_line(&ls, settings)
                .map(Geometry::MultiPolygon)
                .ok_or_else(unsupported)
        }
        Geometry::LineString(ls) => {
            if is_closed_ring(ls) {
                Ok(Geometry::Polygon(Polygon::new(ls.clone(), vec![])))
            } else {
                buffer_line(ls, settings)
                    .map(Geometry::MultiPolygon)
                    .ok_or_else(unsupported)
            }
        }
        Geometry::MultiLineString(mls) => {
            let parts: Vec<MultiPolygon> = mls
                .0
                .iter()
                .filter_map(|ls| buffer_line(ls, settings))
                .collect();
            let merged = union_all(parts);
            if merged.0.is_empty() {
                Err(unsupported())
            } else {
                Ok(Geometry::MultiPolygon(merged))
            }
        }
        Geometry::GeometryCollection(gc) => {
            let mut parts = Vec::new();
            for member in gc.0.iter() {
                let converted = match member {
                    g if is_polygonal(g) => g.clone(),
                    Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                        to_polygon(member, None, settings)?
                    }
                    _ => continue,
                };
                parts.push(match converted {
                    Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    Geometry::MultiPolygon(mp) => mp,
                    _ => continue,
                });
            }
            let merged = union_all(parts);
            if merged.0.is_empty() {
                Err(unsupported())
            } else {
                Ok(Geometry::MultiPolygon(merged))
            }
        }
        Geometry::MultiPoint(_) => Err(unsupported()),
    }
}

/// Cercle autour d'un point
pub fn circle(center: Point, radius: f64, settings: &ValidateSettings) -> Polygon {
    let segments = settings.circle_segments.max(8);
    let mut coords: Vec<Coord> = (0..segments)
        .map(|i| {
            let angle = 360.0 * i as f64 / segments as f64;
            if settings.geographic {
                center.haversine_destination(angle, radius).0
            } else {
                let rad = angle.to_radians();
                Coord {
                    x: center.x() + radius * rad.sin(),
                    y: center.y() + radius * rad.cos(),
                }
            }
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

fn is_closed_ring(ls: &LineString) -> bool {
    match (ls.0.first(), ls.0.last()) {
        (Some(&first), Some(&last)) => ls.0.len() >= 4 && coords_equal(first, last),
        _ => false,
    }
}

/// Buffer plan d'une ligne: union des enveloppes convexes de cercles aux extrémités
fn buffer_line(ls: &LineString, settings: &ValidateSettings) -> Option<MultiPolygon> {
    let distance = settings.line_buffer;
    if ls.0.len() < 2 || distance <= 0.0 {
        return None;
    }

    let planar = ValidateSettings {
        geographic: false,
        circle_segments: (settings.circle_segments / 4).max(8),
        ..settings.clone()
    };

    let capsules: Vec<MultiPolygon> = ls
        .lines()
        .map(|segment| {
            let mut points: Vec<Point> = circle(segment.start.into(), distance, &planar)
                .exterior()
                .points()
                .collect();
            points.extend(circle(segment.end.into(), distance, &planar).exterior().points());
            MultiPolygon::new(vec![MultiPoint::new(points).convex_hull()])
        })
        .collect();

    let mut iter = capsules.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| acc.union(&next)))
}
