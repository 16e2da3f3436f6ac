use anyhow::{ensure, Result};

use crate::geo::{self, BoundingBox, DistanceKm, GeoPoint};

/// Center used when no point has been picked.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(107.57504888132391, -6.874693043534695);

/// A validated "everything within N km of here" request.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadiusQuery {
    pub center: GeoPoint,
    pub max_distance_km: DistanceKm,
}

impl RadiusQuery {
    pub fn new(center: GeoPoint, max_distance_km: DistanceKm) -> Result<Self> {
        ensure!(
            center.is_finite() && center.in_range(),
            "center {} is not a valid lon,lat position",
            center
        );
        ensure!(
            max_distance_km.is_finite() && max_distance_km > 0.0,
            "max distance must be a positive number of kilometers, got {}",
            max_distance_km
        );
        Ok(Self { center, max_distance_km })
    }

    pub fn around_default(max_distance_km: DistanceKm) -> Result<Self> {
        Self::new(DEFAULT_CENTER, max_distance_km)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        geo::within_radius(self.center, point, self.max_distance_km)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        geo::bounding_box(self.center, self.max_distance_km)
    }

    /// Radius of the drawn search circle, in meters.
    pub fn circle_radius_meters(&self) -> f64 {
        self.max_distance_km * 1000.0
    }
}
