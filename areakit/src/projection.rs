//! Projection des zones vers le CRS de la carte
//!
//! Les zones sont stockées en WGS84 (EPSG:4326). La carte peut être en
//! Web Mercator (EPSG:3857), aussi appelé Pseudo-Mercator.

use geo::{Coord, Geometry, MapCoords};

/// Rayon équatorial WGS84 (mètres)
const WGS84_A: f64 = 6_378_137.0;

/// Latitude maximale représentable en Web Mercator
const MAX_LATITUDE: f64 = 85.051_128_78;

pub const EPSG_4326: u32 = 4326;
pub const EPSG_3857: u32 = 3857;

/// Vrai si la transformation est supportée
pub fn is_supported(epsg: u32) -> bool {
    matches!(epsg, EPSG_4326 | EPSG_3857)
}

/// Convertit lon/lat (degrés) vers Web Mercator
pub fn to_web_mercator(c: Coord) -> Coord {
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: WGS84_A * c.x.to_radians(),
        y: WGS84_A * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Convertit Web Mercator vers lon/lat (degrés)
pub fn from_web_mercator(c: Coord) -> Coord {
    Coord {
        x: (c.x / WGS84_A).to_degrees(),
        y: (2.0 * (c.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees(),
    }
}

/// Projette une géométrie WGS84 vers le CRS cible (copie si identique ou non supporté)
pub fn project(geometry: &Geometry, target_epsg: u32) -> Geometry {
    match target_epsg {
        EPSG_3857 => geometry.map_coords(to_web_mercator),
        _ => geometry.clone(),
    }
}

/// Ramène une géométrie du CRS source vers WGS84
pub fn unproject(geometry: &Geometry, source_epsg: u32) -> Geometry {
    match source_epsg {
        EPSG_3857 => geometry.map_coords(from_web_mercator),
        _ => geometry.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_paris_to_web_mercator() {
        let c = to_web_mercator(Coord { x: 2.35, y: 48.85 });
        assert!((c.x - 261600.0).abs() < 1000.0, "x={}", c.x);
        assert!((c.y - 6250000.0).abs() < 10000.0, "y={}", c.y);
    }

    #[test]
    fn test_roundtrip() {
        let geom = Geometry::Point(Point::new(2.35, 48.85));
        let back = unproject(&project(&geom, EPSG_3857), EPSG_3857);
        let Geometry::Point(p) = back else {
            panic!("expected point");
        };
        assert!((p.x() - 2.35).abs() < 1e-6);
        assert!((p.y() - 48.85).abs() < 1e-6);
    }

    #[test]
    fn test_identity_for_4326() {
        let geom = Geometry::Point(Point::new(2.35, 48.85));
        assert_eq!(project(&geom, EPSG_4326), geom);
    }
}
