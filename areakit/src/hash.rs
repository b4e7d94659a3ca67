//! Hash de géométrie et génération d'identifiants de zones
//!
//! Le hash est normalisé pour être indépendant du vertex de départ des anneaux
//! (un polygone qui commence à un vertex différent aura le même hash).

use blake3::Hasher;
use geo::{Coord, Geometry, LineString, Polygon};

/// Préfixe des identifiants générés
pub const AREA_ID_PREFIX: &str = "area-";

/// Calcule un hash stable d'une géométrie
pub fn geometry_hash(geom: &Geometry) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hash_geometry(&mut hasher, geom);
    *hasher.finalize().as_bytes()
}

fn hash_geometry(hasher: &mut Hasher, geom: &Geometry) {
    match geom {
        Geometry::Point(p) => {
            hasher.update(b"POINT");
            hash_coord(hasher, p.0);
        }
        Geometry::LineString(ls) => {
            hasher.update(b"LINESTRING");
            for coord in ls.0.iter() {
                hash_coord(hasher, *coord);
            }
        }
        Geometry::Polygon(p) => {
            hasher.update(b"POLYGON");
            hash_polygon(hasher, p);
        }
        Geometry::MultiPolygon(mp) => {
            hasher.update(b"MULTIPOLYGON");
            for poly in mp.0.iter() {
                hasher.update(b"POLY");
                hash_polygon(hasher, poly);
            }
        }
        Geometry::GeometryCollection(gc) => {
            hasher.update(b"COLLECTION");
            for member in gc.0.iter() {
                hash_geometry(hasher, member);
            }
        }
        _ => {
            hasher.update(format!("{:?}", geom).as_bytes());
        }
    }
}

fn hash_polygon(hasher: &mut Hasher, polygon: &Polygon) {
    hasher.update(b"EXT");
    hash_ring_normalized(hasher, polygon.exterior());
    for interior in polygon.interiors() {
        hasher.update(b"INT");
        hash_ring_normalized(hasher, interior);
    }
}

/// Hash un anneau en commençant au vertex lexicographiquement le plus petit
fn hash_ring_normalized(hasher: &mut Hasher, ring: &LineString) {
    // Le dernier point d'un anneau fermé est ignoré
    let len = if ring.0.len() > 1 && ring.0.first() == ring.0.last() {
        ring.0.len() - 1
    } else {
        ring.0.len()
    };

    if len == 0 {
        return;
    }

    let min_idx = (0..len)
        .min_by(|&a, &b| {
            let ca = &ring.0[a];
            let cb = &ring.0[b];
            ca.x.partial_cmp(&cb.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ca.y.partial_cmp(&cb.y).unwrap_or(std::cmp::Ordering::Equal))
        })
        .unwrap_or(0);

    for i in 0..len {
        hash_coord(hasher, ring.0[(min_idx + i) % len]);
    }
}

/// Hash une coordonnée arrondie à 9 décimales
fn hash_coord(hasher: &mut Hasher, coord: Coord) {
    let x = (coord.x * 1_000_000_000.0).round() as i64;
    let y = (coord.y * 1_000_000_000.0).round() as i64;
    hasher.update(&x.to_le_bytes());
    hasher.update(&y.to_le_bytes());
}

/// Vrai si les deux géométries ont le même hash normalisé
pub fn same_geometry(a: &Geometry, b: &Geometry) -> bool {
    geometry_hash(a) == geometry_hash(b)
}

/// Génère un identifiant de zone `area-<12 hex>`.
///
/// Le sel (compteur + horloge + géométrie) rend les collisions improbables;
/// le store vérifie malgré tout l'unicité et re-sale si besoin.
pub fn generate_area_id(geometry: Option<&Geometry>, salt: u64) -> String {
    let mut hasher = Hasher::new();
    hasher.update(&salt.to_le_bytes());
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    hasher.update(&nanos.to_le_bytes());
    if let Some(geometry) = geometry {
        hash_geometry(&mut hasher, geometry);
    }
    let digest = hasher.finalize();
    format!("{}{}", AREA_ID_PREFIX, &hex::encode(digest.as_bytes())[..12])
}
