use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Distance in kilometers.
pub type DistanceKm = f64;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Highest zoom level `fit_zoom` will return.
pub const MAX_ZOOM: u8 = 18;

// Web-Mercator ground resolution at the equator for zoom 0, meters per pixel.
const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.033_92;

/// A WGS84 position in decimal degrees, longitude first.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// True when longitude is in [-180, 180] and latitude in [-90, 90].
    pub fn in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

/// Parses `"lon,lat"`.
impl FromStr for GeoPoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            bail!("expected \"lon,lat\", got {:?}", s);
        }
        let lon: f64 = parts[0]
            .parse()
            .with_context(|| format!("invalid longitude {:?}", parts[0]))?;
        let lat: f64 = parts[1]
            .parse()
            .with_context(|| format!("invalid latitude {:?}", parts[1]))?;
        Ok(GeoPoint::new(lon, lat))
    }
}

/// Great-circle distance using the haversine formula on a spherical Earth.
///
/// Coordinates are not range-checked: out-of-range degrees still give a
/// number, just not a meaningful one. NaN or infinite inputs propagate.
pub fn distance(a: GeoPoint, b: GeoPoint) -> DistanceKm {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points. NaN must pass through.
    let h = if h > 1.0 { 1.0 } else { h };
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Same as [`distance`], in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    distance(a, b) * 1000.0
}

/// Whether `candidate` lies within `radius_km` of `center` (inclusive).
///
/// A negative radius contains nothing, not even the center. A zero radius
/// contains only the center itself.
pub fn within_radius(center: GeoPoint, candidate: GeoPoint, radius_km: DistanceKm) -> bool {
    distance(center, candidate) <= radius_km
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Smallest lon/lat box holding every point within `radius_km` of `center`.
///
/// Boxes touching a pole, or wider than the globe, span all longitudes.
/// Longitudes are clamped rather than wrapped at the antimeridian.
pub fn bounding_box(center: GeoPoint, radius_km: DistanceKm) -> BoundingBox {
    let radius_km = radius_km.max(0.0);
    let dlat = (radius_km / EARTH_RADIUS_KM).to_degrees();
    let min_lat = (center.lat - dlat).max(-90.0);
    let max_lat = (center.lat + dlat).min(90.0);

    if min_lat <= -90.0 || max_lat >= 90.0 {
        return BoundingBox { min_lon: -180.0, min_lat, max_lon: 180.0, max_lat };
    }

    // Widest longitude span of a small circle is sin(r) / cos(lat), not r / cos(lat).
    let angular = radius_km / EARTH_RADIUS_KM;
    let ratio = angular.sin() / center.lat.to_radians().cos();
    if !(ratio < 1.0) || angular >= std::f64::consts::FRAC_PI_2 {
        return BoundingBox { min_lon: -180.0, min_lat, max_lon: 180.0, max_lat };
    }
    let dlon = ratio.asin().to_degrees();
    if dlon >= 180.0 {
        return BoundingBox { min_lon: -180.0, min_lat, max_lon: 180.0, max_lat };
    }

    BoundingBox {
        min_lon: (center.lon - dlon).max(-180.0),
        min_lat,
        max_lon: (center.lon + dlon).min(180.0),
        max_lat,
    }
}

/// Largest web-map zoom level at which a circle of `radius_km` around
/// `center` fits inside a square viewport of `viewport_px` pixels.
pub fn fit_zoom(center: GeoPoint, radius_km: DistanceKm, viewport_px: u32) -> u8 {
    if viewport_px == 0 {
        return 0;
    }
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return MAX_ZOOM;
    }
    let diameter_m = 2.0 * radius_km * 1000.0;
    let meters_per_px_z0 = EQUATOR_METERS_PER_PIXEL * center.lat.to_radians().cos().abs();
    // resolution(z) = meters_per_px_z0 / 2^z must be >= diameter_m / viewport_px
    let z = (meters_per_px_z0 * viewport_px as f64 / diameter_m).log2().floor();
    if z.is_nan() || z < 0.0 {
        0
    } else if z >= MAX_ZOOM as f64 {
        MAX_ZOOM
    } else {
        z as u8
    }
}
