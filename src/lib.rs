//! Great-circle distance and radius search over road geometry.
//!
//! [`geo`] holds the haversine distance, the radius predicate and the
//! viewport-fit helpers. [`search`] validates a radius query. [`roads`]
//! loads road polylines from OSM or CSV and finds the ones near a point, and
//! [`regions`] does the same for polygon areas.

pub mod geo;
pub mod regions;
pub mod roads;
pub mod search;

pub use geo::{distance, within_radius, BoundingBox, DistanceKm, GeoPoint};
pub use search::{RadiusQuery, DEFAULT_CENTER};
