use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::info;

use georadius::geo::{self, GeoPoint};
use georadius::regions;
use georadius::roads::{self, Road};
use georadius::search::{RadiusQuery, DEFAULT_CENTER};

#[derive(Parser, Debug)]
#[command(name = "georadius")]
#[command(about = "Great-circle distances, radius checks and nearby road/region search. Points are given as lon,lat.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Distance between two points
    Distance {
        #[arg(long, allow_hyphen_values = true)]
        from: GeoPoint,

        #[arg(long, allow_hyphen_values = true)]
        to: GeoPoint,

        /// Print meters instead of kilometers
        #[arg(long, default_value_t = false)]
        meters: bool,
    },

    /// Whether a point lies within a radius of a center
    Within {
        #[arg(short, long, allow_hyphen_values = true)]
        center: GeoPoint,

        #[arg(short, long, allow_hyphen_values = true)]
        point: GeoPoint,

        /// Radius in kilometers
        #[arg(short, long, allow_negative_numbers = true)]
        radius: f64,
    },

    /// Bounding box and zoom level that show a radius circle
    Fit {
        #[arg(short, long, allow_hyphen_values = true)]
        center: GeoPoint,

        /// Radius in kilometers
        #[arg(short, long)]
        radius: f64,

        /// Viewport size in pixels
        #[arg(long, default_value_t = 800)]
        viewport: u32,
    },

    /// Roads with a vertex within a distance of a center
    Roads {
        /// Path to an .osm.pbf file
        #[arg(long, conflicts_with = "csv")]
        pbf: Option<String>,

        /// Path to a road_id,lon,lat[,name] CSV file
        #[arg(long)]
        csv: Option<String>,

        /// Search center; defaults to the built-in start point
        #[arg(short, long, allow_hyphen_values = true)]
        center: Option<GeoPoint>,

        /// Maximum distance in kilometers
        #[arg(short, long)]
        max_distance: f64,

        /// Output CSV (road_id, name, kind, nearest_km, vertices). If omitted, prints a summary to stdout.
        #[arg(short, long)]
        out: Option<String>,

        /// Only include 'highway' ways from .pbf input. If false, attempts to include all linear ways.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        only_highways: bool,
    },

    /// Regions holding a center, or with a vertex within a distance of it
    Regions {
        /// Path to a region_id,ring,lon,lat[,name] CSV file
        #[arg(long)]
        csv: String,

        /// Search center; defaults to the built-in start point
        #[arg(short, long, allow_hyphen_values = true)]
        center: Option<GeoPoint>,

        /// Maximum distance in kilometers
        #[arg(short, long)]
        max_distance: f64,

        /// Output CSV (region_id, name, contains_center, nearest_km, rings). If omitted, prints a summary to stdout.
        #[arg(short, long)]
        out: Option<String>,
    },
}

fn load_roads(pbf: Option<String>, csv: Option<String>, only_highways: bool) -> Result<Vec<Road>> {
    match (pbf, csv) {
        (Some(path), None) => roads::load_roads_from_pbf(&path, only_highways),
        (None, Some(path)) => roads::load_roads_from_csv(&path),
        _ => bail!("exactly one of --pbf or --csv is required"),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Distance { from, to, meters } => {
            if meters {
                println!("{:.3}", geo::distance_meters(from, to));
            } else {
                println!("{:.6}", geo::distance(from, to));
            }
        }
        Command::Within { center, point, radius } => {
            println!("{}", geo::within_radius(center, point, radius));
        }
        Command::Fit { center, radius, viewport } => {
            let query = RadiusQuery::new(center, radius)?;
            println!("circle: {:.0} m", query.circle_radius_meters());
            println!("bbox: {}", query.bounding_box());
            println!("zoom: {}", geo::fit_zoom(center, radius, viewport));
        }
        Command::Roads {
            pbf,
            csv,
            center,
            max_distance,
            out,
            only_highways,
        } => {
            let query = RadiusQuery::new(center.unwrap_or(DEFAULT_CENTER), max_distance)?;
            let roads = load_roads(pbf, csv, only_highways)?;
            let matches = roads::roads_within(&roads, &query);
            info!(
                "{} of {} roads within {} km of {}",
                matches.len(),
                roads.len(),
                query.max_distance_km,
                query.center
            );

            if let Some(out_path) = out {
                roads::write_matches(&out_path, &matches)?;
                println!("Wrote {} roads to {}", matches.len(), out_path);
            } else {
                println!("Roads: {}", roads.len());
                println!("Within {} km of {}: {}", query.max_distance_km, query.center, matches.len());
                for m in matches.iter().take(10) {
                    println!(
                        "  {} {} ({}) {:.3} km",
                        m.road_id,
                        m.name.as_deref().unwrap_or("-"),
                        m.kind.as_deref().unwrap_or("-"),
                        m.nearest_km
                    );
                }
            }
        }
        Command::Regions {
            csv,
            center,
            max_distance,
            out,
        } => {
            let query = RadiusQuery::new(center.unwrap_or(DEFAULT_CENTER), max_distance)?;
            let regions = regions::load_regions_from_csv(&csv)?;
            let matches = regions::regions_within(&regions, &query);
            info!(
                "{} of {} regions within {} km of {}",
                matches.len(),
                regions.len(),
                query.max_distance_km,
                query.center
            );

            if let Some(out_path) = out {
                regions::write_region_matches(&out_path, &matches)?;
                println!("Wrote {} regions to {}", matches.len(), out_path);
            } else {
                println!("Regions: {}", regions.len());
                println!("Within {} km of {}: {}", query.max_distance_km, query.center, matches.len());
                for m in matches.iter().take(10) {
                    let place = if m.contains_center { "inside" } else { "near" };
                    println!(
                        "  {} {} {} {:.3} km",
                        m.region_id,
                        m.name.as_deref().unwrap_or("-"),
                        place,
                        m.nearest_km
                    );
                }
            }
        }
    }

    Ok(())
}
