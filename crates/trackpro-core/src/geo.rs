//! Geospatial helpers.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance between two points, in meters.
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_km(a, b) * 1000.0
}

/// Arithmetic center of a set of points. Empty input yields `(0, 0)`.
pub fn center_of(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let (lat, lng) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    GeoPoint::new(lat / n, lng / n)
}

/// Bounds of a set of points, padded by 10% of the span on each axis.
pub fn bounds_of(points: &[GeoPoint]) -> Bounds {
    let Some(first) = points.first() else {
        return Bounds { north: 0.0, south: 0.0, east: 0.0, west: 0.0 };
    };

    let mut b = Bounds {
        north: first.lat,
        south: first.lat,
        east: first.lng,
        west: first.lng,
    };
    for p in points {
        b.north = b.north.max(p.lat);
        b.south = b.south.min(p.lat);
        b.east = b.east.max(p.lng);
        b.west = b.west.min(p.lng);
    }

    let lat_buffer = (b.north - b.south) * 0.1;
    let lng_buffer = (b.east - b.west) * 0.1;
    Bounds {
        north: b.north + lat_buffer,
        south: b.south - lat_buffer,
        east: b.east + lng_buffer,
        west: b.west - lng_buffer,
    }
}
