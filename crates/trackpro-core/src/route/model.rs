//! Route and checkpoint domain models.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Default checkpoint radius in meters.
pub const DEFAULT_CHECKPOINT_RADIUS_M: f64 = 50.0;

/// GeoJSON `LineString` geometry. Coordinates are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonLineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl GeoJsonLineString {
    pub fn new(points: &[GeoPoint]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: points.iter().map(|p| [p.lng, p.lat]).collect(),
        }
    }

    pub fn points(&self) -> Vec<GeoPoint> {
        self.coordinates
            .iter()
            .map(|[lng, lat]| GeoPoint::new(*lat, *lng))
            .collect()
    }
}

/// GeoJSON `Point` geometry. Coordinates are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoJsonPoint {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [point.lng, point.lat],
        }
    }

    pub fn to_geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[1], self.coordinates[0])
    }
}

/// A course that events can follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Length in kilometers.
    pub distance: f64,
    pub path: GeoJsonLineString,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub distance: f64,
    pub path: GeoJsonLineString,
    #[serde(default)]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub distance: Option<f64>,
    pub path: Option<GeoJsonLineString>,
    pub created_by: Option<i64>,
}

/// A control point along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: i64,
    pub name: String,
    pub route_id: i64,
    pub order: i64,
    pub location: GeoJsonPoint,
    /// Capture radius in meters.
    pub radius: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCheckpoint {
    pub name: String,
    pub route_id: i64,
    pub order: i64,
    pub location: GeoJsonPoint,
    #[serde(default)]
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointUpdate {
    pub name: Option<String>,
    pub route_id: Option<i64>,
    pub order: Option<i64>,
    pub location: Option<GeoJsonPoint>,
    pub radius: Option<f64>,
}
