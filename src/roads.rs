use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use fnv::FnvHashMap;
use log::{debug, info};
use ordered_float::OrderedFloat;
use osmpbfreader::{NodeId, OsmObj, OsmPbfReader, Tags};

use crate::geo::{self, DistanceKm, GeoPoint};
use crate::search::RadiusQuery;

/// A road polyline, vertices in path order.
#[derive(Clone, Debug, PartialEq)]
pub struct Road {
    pub id: i64,
    pub name: Option<String>,
    /// OSM `highway` value, when known.
    pub kind: Option<String>,
    pub coordinates: Vec<GeoPoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoadMatch {
    pub road_id: i64,
    pub name: Option<String>,
    pub kind: Option<String>,
    /// Distance from the query center to the closest vertex.
    pub nearest_km: DistanceKm,
    pub vertex_count: usize,
}

/// Ways worth loading as roads: tagged `highway` (when required) and not an area.
fn is_road_way(tags: &Tags, only_highways: bool) -> bool {
    let is_area = matches!(tags.get("area").map(|s| s.as_str()), Some("yes"));
    !is_area && (!only_highways || tags.contains_key("highway"))
}

fn tag_value(tags: &Tags, key: &str) -> Option<String> {
    tags.get(key).map(|v| v.to_string())
}

/// Loads road polylines from an `.osm.pbf` extract.
///
/// Two passes: the first keeps routable ways and the node ids they use, the
/// second resolves those nodes to coordinates. Nodes missing from the
/// extract are skipped, and a way with no resolved nodes is dropped.
pub fn load_roads_from_pbf<P: AsRef<Path>>(path: P, only_highways: bool) -> Result<Vec<Road>> {
    let path = path.as_ref();

    // Pass 1: collect routable ways and the set of node ids they reference
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut pbf = OsmPbfReader::new(file);

    let mut needed_nodes: HashSet<NodeId> = HashSet::new();
    let mut ways: Vec<(Road, Vec<NodeId>)> = Vec::new();

    for obj in pbf.iter() {
        let obj = obj?;
        if let OsmObj::Way(w) = obj {
            if is_road_way(&w.tags, only_highways) {
                needed_nodes.extend(w.nodes.iter().copied());
                let road = Road {
                    id: w.id.0,
                    name: tag_value(&w.tags, "name"),
                    kind: tag_value(&w.tags, "highway"),
                    coordinates: Vec::new(),
                };
                ways.push((road, w.nodes));
            }
        }
    }

    info!(
        "Collected {} routable ways; {} unique node refs",
        ways.len(),
        needed_nodes.len()
    );

    // Pass 2: read coordinates for needed nodes
    let file = File::open(path).with_context(|| format!("reopening {}", path.display()))?;
    let mut pbf = OsmPbfReader::new(file);

    let mut coords: FnvHashMap<NodeId, GeoPoint> = FnvHashMap::default();
    for obj in pbf.iter() {
        let obj = obj?;
        if let OsmObj::Node(n) = obj {
            if needed_nodes.contains(&n.id) {
                coords.insert(n.id, GeoPoint::new(n.lon(), n.lat()));
            }
        }
    }

    info!("Loaded coordinates for {} nodes actually present", coords.len());

    let total = ways.len();
    let roads: Vec<Road> = ways
        .into_iter()
        .filter_map(|(road, nodes)| assemble_road(road, &nodes, &coords))
        .collect();

    if roads.len() < total {
        debug!("Dropped {} ways with no resolvable nodes", total - roads.len());
    }
    Ok(roads)
}

/// Fills in a road's vertices from its node refs, skipping unknown nodes.
/// Returns `None` when no node resolves.
fn assemble_road(
    mut road: Road,
    nodes: &[NodeId],
    coords: &FnvHashMap<NodeId, GeoPoint>,
) -> Option<Road> {
    road.coordinates = nodes.iter().filter_map(|nid| coords.get(nid).copied()).collect();
    if road.coordinates.is_empty() {
        None
    } else {
        Some(road)
    }
}

/// Loads roads from a CSV of `road_id,lon,lat[,name]` rows with a header.
///
/// Rows sharing a `road_id` are vertices of the same road, in file order.
pub fn load_roads_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Road>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut roads: Vec<Road> = Vec::new();
    let mut index: FnvHashMap<i64, usize> = FnvHashMap::default();

    for (i, result) in rdr.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let record = result.with_context(|| format!("reading line {}", line))?;
        let field = |n: usize, what: &'static str| {
            record
                .get(n)
                .with_context(|| format!("line {}: missing {}", line, what))
        };
        let road_id: i64 = field(0, "road_id")?
            .parse()
            .with_context(|| format!("line {}: invalid road_id", line))?;
        let lon: f64 = field(1, "lon")?
            .parse()
            .with_context(|| format!("line {}: invalid lon", line))?;
        let lat: f64 = field(2, "lat")?
            .parse()
            .with_context(|| format!("line {}: invalid lat", line))?;
        let name = record.get(3).filter(|s| !s.is_empty()).map(str::to_string);

        let idx = *index.entry(road_id).or_insert_with(|| {
            roads.push(Road {
                id: road_id,
                name: None,
                kind: None,
                coordinates: Vec::new(),
            });
            roads.len() - 1
        });
        let road = &mut roads[idx];
        road.coordinates.push(GeoPoint::new(lon, lat));
        if road.name.is_none() {
            road.name = name;
        }
    }

    info!("Loaded {} roads from {}", roads.len(), path.display());
    Ok(roads)
}

/// Roads with at least one vertex inside the query circle, nearest first.
pub fn roads_within(roads: &[Road], query: &RadiusQuery) -> Vec<RoadMatch> {
    let bbox = query.bounding_box();
    // A box clamped at the antimeridian would hide vertices on the far side.
    let use_bbox = bbox.min_lon > -180.0 && bbox.max_lon < 180.0;

    let mut matches: Vec<RoadMatch> = roads
        .iter()
        .filter_map(|road| {
            let (vertex, nearest) = road
                .coordinates
                .iter()
                .filter(|p| !use_bbox || bbox.contains(**p))
                .map(|p| (*p, geo::distance(query.center, *p)))
                .min_by_key(|(_, d)| OrderedFloat(*d))?;
            if !query.contains(vertex) {
                return None;
            }
            Some(RoadMatch {
                road_id: road.id,
                name: road.name.clone(),
                kind: road.kind.clone(),
                nearest_km: nearest,
                vertex_count: road.coordinates.len(),
            })
        })
        .collect();

    matches.sort_by_key(|m| (OrderedFloat(m.nearest_km), m.road_id));
    matches
}

pub fn write_matches<P: AsRef<Path>>(path: P, matches: &[RoadMatch]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("creating CSV {}", path.display()))?;
    wtr.write_record(["road_id", "name", "kind", "nearest_km", "vertices"])?;
    for m in matches {
        wtr.write_record(&[
            m.road_id.to_string(),
            m.name.clone().unwrap_or_default(),
            m.kind.clone().unwrap_or_default(),
            format!("{:.6}", m.nearest_km),
            m.vertex_count.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
