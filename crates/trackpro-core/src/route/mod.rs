//! Routes and checkpoints.

pub mod model;

use crate::error::{require_text, CoreError, CoreResult};
pub use model::{
    Checkpoint, CheckpointUpdate, GeoJsonLineString, GeoJsonPoint, NewCheckpoint, NewRoute, Route,
    RouteUpdate, DEFAULT_CHECKPOINT_RADIUS_M,
};

impl NewRoute {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(CoreError::validation("distance must be a non-negative number"));
        }
        if self.path.points().iter().any(|p| !p.is_valid()) {
            return Err(CoreError::validation("path contains an invalid coordinate"));
        }
        Ok(())
    }
}

impl Route {
    pub fn apply(&mut self, update: RouteUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(distance) = update.distance {
            self.distance = distance;
        }
        if let Some(path) = update.path {
            self.path = path;
        }
        if let Some(created_by) = update.created_by {
            self.created_by = Some(created_by);
        }
    }
}

impl NewCheckpoint {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        if !self.location.to_geo_point().is_valid() {
            return Err(CoreError::validation("checkpoint location out of range"));
        }
        if self.radius.is_some_and(|r| !r.is_finite() || r <= 0.0) {
            return Err(CoreError::validation("radius must be positive"));
        }
        Ok(())
    }
}

impl Checkpoint {
    pub fn apply(&mut self, update: CheckpointUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(route_id) = update.route_id {
            self.route_id = route_id;
        }
        if let Some(order) = update.order {
            self.order = order;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(radius) = update.radius {
            self.radius = radius;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    #[test]
    fn test_geojson_coordinate_order() {
        let line: GeoJsonLineString =
            serde_json::from_str(r#"{"type":"LineString","coordinates":[[-122.4194,37.7749]]}"#)
                .unwrap();
        assert_eq!(line.points(), vec![GeoPoint::new(37.7749, -122.4194)]);

        let point = GeoJsonPoint::new(GeoPoint::new(37.0, -122.0));
        assert_eq!(point.coordinates, [-122.0, 37.0]);
        assert_eq!(point.to_geo_point(), GeoPoint::new(37.0, -122.0));
    }

    #[test]
    fn test_checkpoint_validation() {
        let mut cp = NewCheckpoint {
            name: "CP1".to_string(),
            route_id: 1,
            order: 1,
            location: GeoJsonPoint::new(GeoPoint::new(37.7853, -122.4101)),
            radius: None,
        };
        assert!(cp.validate().is_ok());

        cp.radius = Some(0.0);
        assert!(cp.validate().is_err());
    }
}
