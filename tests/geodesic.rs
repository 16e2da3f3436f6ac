//! Property tests for the distance and radius functions.

use georadius::geo::{bounding_box, distance, fit_zoom, within_radius, GeoPoint};
use georadius::DEFAULT_CENTER;
use proptest::prelude::*;

fn point() -> impl Strategy<Value = GeoPoint> {
    (-180.0f64..=180.0, -90.0f64..=90.0).prop_map(|(lon, lat)| GeoPoint::new(lon, lat))
}

proptest! {
    #[test]
    fn distance_to_self_is_zero(p in point()) {
        prop_assert_eq!(distance(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric(a in point(), b in point()) {
        prop_assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn distance_is_non_negative(a in point(), b in point()) {
        prop_assert!(distance(a, b) >= 0.0);
    }

    #[test]
    fn triangle_inequality(a in point(), b in point(), c in point()) {
        prop_assert!(distance(a, c) <= distance(a, b) + distance(b, c) + 1e-3);
    }

    #[test]
    fn center_within_any_non_negative_radius(p in point(), r in 0.0f64..1000.0) {
        prop_assert!(within_radius(p, p, r));
    }

    #[test]
    fn points_in_radius_are_in_bounding_box(
        lon in -160.0f64..160.0,
        lat in -80.0f64..80.0,
        r in 0.1f64..200.0,
        bearing in 0.0f64..360.0,
        frac in 0.0f64..1.0,
    ) {
        let center = GeoPoint::new(lon, lat);
        // Destination point along a great circle, slightly inside the radius.
        let d = r * frac * 0.999 / 6371.0;
        let (lat1, lon1, brg) = (lat.to_radians(), lon.to_radians(), bearing.to_radians());
        let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * brg.cos()).asin();
        let lon2 = lon1 + (brg.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());
        let p = GeoPoint::new(lon2.to_degrees(), lat2.to_degrees());
        prop_assert!(within_radius(center, p, r));
        let bbox = bounding_box(center, r);
        prop_assert!(bbox.contains(p), "{} outside {}", p, bbox);
    }

    #[test]
    fn zoom_never_increases_with_radius(r1 in 0.01f64..5000.0, r2 in 0.01f64..5000.0) {
        let (small, large) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        prop_assert!(fit_zoom(DEFAULT_CENTER, small, 800) >= fit_zoom(DEFAULT_CENTER, large, 800));
    }
}

#[test]
fn default_center_distance_is_zero() {
    assert_eq!(distance(DEFAULT_CENTER, DEFAULT_CENTER), 0.0);
}

#[test]
fn one_degree_latitude_apart() {
    let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
    assert!((d - 111.19).abs() < 0.5);
}

#[test]
fn zero_radius_only_contains_center() {
    let far = GeoPoint::new(DEFAULT_CENTER.lon, DEFAULT_CENTER.lat + 1.0);
    assert!(within_radius(DEFAULT_CENTER, DEFAULT_CENTER, 0.0));
    assert!(!within_radius(DEFAULT_CENTER, far, 0.0));
}
