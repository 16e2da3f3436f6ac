use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Writer};
use fnv::FnvHashMap;
use log::info;
use ordered_float::OrderedFloat;

use crate::geo::{self, DistanceKm, GeoPoint};
use crate::search::RadiusQuery;

/// A polygon area. The first ring is the outline, later rings are holes.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub id: i64,
    pub name: Option<String>,
    pub rings: Vec<Vec<GeoPoint>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionMatch {
    pub region_id: i64,
    pub name: Option<String>,
    /// Whether the query center lies inside the region.
    pub contains_center: bool,
    /// Zero when the center is inside, else the distance to the closest vertex.
    pub nearest_km: DistanceKm,
    pub ring_count: usize,
}

// Even-odd ray casting in the lon/lat plane. Rings may be open or closed.
fn ring_contains(ring: &[GeoPoint], p: GeoPoint) -> bool {
    let mut inside = false;
    let mut j = match ring.len() {
        0..=2 => return false,
        n => n - 1,
    };
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.lat > p.lat) != (b.lat > p.lat)
            && p.lon < (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

impl Region {
    /// Planar point-in-polygon test on raw degrees. Not meant for regions
    /// that straddle the antimeridian or a pole.
    pub fn contains(&self, p: GeoPoint) -> bool {
        match self.rings.split_first() {
            Some((outer, holes)) => {
                ring_contains(outer, p) && !holes.iter().any(|hole| ring_contains(hole, p))
            }
            None => false,
        }
    }

    pub fn vertices(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.rings.iter().flatten().copied()
    }
}

/// Loads regions from a CSV of `region_id,ring,lon,lat[,name]` rows with a header.
///
/// Rows sharing a `region_id` and `ring` are the vertices of that ring, in
/// file order. Ring 0 is the outline; ring numbers must appear in order.
pub fn load_regions_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Region>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut regions: Vec<Region> = Vec::new();
    let mut index: FnvHashMap<i64, usize> = FnvHashMap::default();

    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result.with_context(|| format!("reading line {}", line))?;
        let field = |n: usize, what: &'static str| {
            record
                .get(n)
                .with_context(|| format!("line {}: missing {}", line, what))
        };
        let region_id: i64 = field(0, "region_id")?
            .parse()
            .with_context(|| format!("line {}: invalid region_id", line))?;
        let ring: usize = field(1, "ring")?
            .parse()
            .with_context(|| format!("line {}: invalid ring", line))?;
        let lon: f64 = field(2, "lon")?
            .parse()
            .with_context(|| format!("line {}: invalid lon", line))?;
        let lat: f64 = field(3, "lat")?
            .parse()
            .with_context(|| format!("line {}: invalid lat", line))?;
        let name = record.get(4).filter(|s| !s.is_empty()).map(str::to_string);

        let idx = *index.entry(region_id).or_insert_with(|| {
            regions.push(Region {
                id: region_id,
                name: None,
                rings: Vec::new(),
            });
            regions.len() - 1
        });
        let region = &mut regions[idx];
        if ring == region.rings.len() {
            region.rings.push(Vec::new());
        } else if ring > region.rings.len() {
            bail!(
                "line {}: region {} ring {} before ring {}",
                line,
                region_id,
                ring,
                region.rings.len()
            );
        }
        region.rings[ring].push(GeoPoint::new(lon, lat));
        if region.name.is_none() {
            region.name = name;
        }
    }

    info!("Loaded {} regions from {}", regions.len(), path.display());
    Ok(regions)
}

/// Regions that hold the query center or have a vertex inside the query
/// circle. Regions holding the center come first, then nearest vertex.
pub fn regions_within(regions: &[Region], query: &RadiusQuery) -> Vec<RegionMatch> {
    let mut matches: Vec<RegionMatch> = regions
        .iter()
        .filter_map(|region| {
            let contains_center = region.contains(query.center);
            let nearest_km = if contains_center {
                0.0
            } else {
                let (vertex, d) = region
                    .vertices()
                    .map(|p| (p, geo::distance(query.center, p)))
                    .min_by_key(|(_, d)| OrderedFloat(*d))?;
                if !query.contains(vertex) {
                    return None;
                }
                d
            };
            Some(RegionMatch {
                region_id: region.id,
                name: region.name.clone(),
                contains_center,
                nearest_km,
                ring_count: region.rings.len(),
            })
        })
        .collect();

    matches.sort_by_key(|m| (!m.contains_center, OrderedFloat(m.nearest_km), m.region_id));
    matches
}

pub fn write_region_matches<P: AsRef<Path>>(path: P, matches: &[RegionMatch]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("creating CSV {}", path.display()))?;
    wtr.write_record(["region_id", "name", "contains_center", "nearest_km", "rings"])?;
    for m in matches {
        wtr.write_record(&[
            m.region_id.to_string(),
            m.name.clone().unwrap_or_default(),
            m.contains_center.to_string(),
            format!("{:.6}", m.nearest_km),
            m.ring_count.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn square(lon: f64, lat: f64, half: f64) -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(lon - half, lat - half),
            GeoPoint::new(lon + half, lat - half),
            GeoPoint::new(lon + half, lat + half),
            GeoPoint::new(lon - half, lat + half),
        ]
    }

    fn region(id: i64, rings: Vec<Vec<GeoPoint>>) -> Region {
        Region { id, name: None, rings }
    }

    #[test]
    fn contains_respects_holes() {
        let r = region(1, vec![square(0.0, 0.0, 1.0), square(0.0, 0.0, 0.25)]);
        assert!(r.contains(GeoPoint::new(0.5, 0.5)));
        assert!(!r.contains(GeoPoint::new(0.0, 0.0)));
        assert!(!r.contains(GeoPoint::new(2.0, 0.0)));
    }

    #[test]
    fn closed_and_degenerate_rings() {
        let mut closed = square(10.0, 10.0, 1.0);
        closed.push(closed[0]);
        assert!(region(1, vec![closed]).contains(GeoPoint::new(10.2, 9.7)));
        let line = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)];
        assert!(!region(2, vec![line]).contains(GeoPoint::new(0.5, 0.5)));
        assert!(!region(3, vec![]).contains(GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn center_inside_large_region_matches_at_zero() {
        // Every vertex is ~111 km away, well outside a 5 km query.
        let q = RadiusQuery::new(GeoPoint::new(0.0, 0.0), 5.0).unwrap();
        let regions = vec![
            region(7, vec![square(0.0, 0.0, 1.0)]),
            region(8, vec![square(0.0, 0.0, 1.0), square(0.0, 0.0, 0.5)]),
        ];
        let matches = regions_within(&regions, &q);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].region_id, 7);
        assert!(matches[0].contains_center);
        assert_eq!(matches[0].nearest_km, 0.0);
    }

    #[test]
    fn nearby_regions_sorted_after_containing_ones() {
        let q = RadiusQuery::new(GeoPoint::new(0.0, 0.0), 5.0).unwrap();
        let regions = vec![
            region(1, vec![square(0.04, 0.0, 0.01)]), // nearest vertex ~3.5 km
            region(2, vec![square(0.02, 0.0, 0.01)]), // ~1.6 km
            region(3, vec![square(0.0, 0.0, 0.01)]),  // holds the center
            region(4, vec![square(1.0, 1.0, 0.01)]),  // far away
        ];
        let ids: Vec<i64> = regions_within(&regions, &q).iter().map(|m| m.region_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn csv_builds_rings() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            "region_id,ring,lon,lat,name\n\
             5,0,107.0,-7.0,Cidadap\n\
             5,0,108.0,-7.0,\n\
             5,0,108.0,-6.0,\n\
             5,1,107.4,-6.6,\n\
             5,1,107.6,-6.6,\n\
             5,1,107.6,-6.4,\n\
             6,0,100.0,0.0\n"
        )
        .unwrap();
        f.flush().unwrap();

        let regions = load_regions_from_csv(f.path()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name.as_deref(), Some("Cidadap"));
        assert_eq!(regions[0].rings.len(), 2);
        assert_eq!(regions[0].rings[1].len(), 3);
        assert_eq!(regions[1].rings, vec![vec![GeoPoint::new(100.0, 0.0)]]);
    }

    #[test]
    fn csv_rejects_skipped_ring() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "region_id,ring,lon,lat\n1,0,1.0,1.0\n1,2,1.0,1.0\n").unwrap();
        f.flush().unwrap();
        let err = load_regions_from_csv(f.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"), "{:#}", err);
    }

    #[test]
    fn writes_region_csv() {
        let out = NamedTempFile::new().unwrap();
        let matches = vec![RegionMatch {
            region_id: 5,
            name: Some("Cidadap".to_string()),
            contains_center: true,
            nearest_km: 0.0,
            ring_count: 1,
        }];
        write_region_matches(out.path(), &matches).unwrap();
        assert_eq!(
            std::fs::read_to_string(out.path()).unwrap(),
            "region_id,name,contains_center,nearest_km,rings\n5,Cidadap,true,0.000000,1\n"
        );
    }
}
