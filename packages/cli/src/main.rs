#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for ward boundary queries and analytics reports.
//!
//! The backend comes from `--fixture` (a `GeoJSON` ward file), `--config`
//! (a TOML backend config) or the `KENYA_GEO_CONFIG` environment variable,
//! in that order. Without any of them an empty in-memory backend is used.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kenya_geo_analytics::reporting::{self, ReportFormat};
use kenya_geo_analytics::{Analytics, AnalyticsQueries, DEFAULT_TOP_LIMIT};
use kenya_geo_boundaries_models::{Point, Ward};
use kenya_geo_data_access::{BackendConfig, DataAccess, DataAccessError};

/// Environment variable naming the backend config file.
const CONFIG_ENV: &str = "KENYA_GEO_CONFIG";

/// Query and report on Kenya's administrative ward boundaries.
#[derive(Parser)]
#[command(name = "kenya_geo")]
#[command(about = "Query and report on Kenya's administrative ward boundaries")]
struct Cli {
    /// Backend config TOML file. Defaults to `$KENYA_GEO_CONFIG`.
    #[arg(long, conflicts_with = "fixture")]
    config: Option<PathBuf>,

    /// `GeoJSON` ward `FeatureCollection` to load into memory.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Dataset totals, averages and extremes.
    Summary,

    /// Counties with the most wards.
    Top {
        #[arg(long, default_value_t = DEFAULT_TOP_LIMIT)]
        limit: usize,
    },

    /// One county's figures and constituencies.
    County { name: String },

    /// Compare two counties' ward counts.
    Compare { first: String, second: String },

    /// Counties whose ward count lies in `[min, max]`.
    Range { min: u64, max: u64 },

    /// The ward containing a point.
    WardAt {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
    },

    /// Wards nearest to a point.
    Nearest {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Shape measurements of one ward.
    Boundary { ward: String },

    /// Full analytics report.
    Report {
        /// `text`, `json` or `csv`.
        #[arg(long, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Spread of ward counts across counties.
    Variance,
}

fn backend_config(cli: &Cli) -> Result<BackendConfig, DataAccessError> {
    if let Some(fixture) = &cli.fixture {
        return Ok(BackendConfig::Memory {
            fixture: Some(fixture.clone()),
            dataset: None,
        });
    }

    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => {
            log::debug!("Loading backend config from {}", path.display());
            BackendConfig::load(&path)
        }
        None => {
            log::warn!("No --fixture, --config or {CONFIG_ENV}; using an empty dataset");
            Ok(BackendConfig::Memory {
                fixture: None,
                dataset: None,
            })
        }
    }
}

fn describe(ward: &Ward) -> String {
    format!(
        "{} ({} constituency, {} county)",
        ward.name, ward.constituency_name, ward.county_name
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let backend: Arc<dyn DataAccess> = kenya_geo_data_access::create(&backend_config(&cli)?)?;
    let analytics = Analytics::new(backend.clone());
    let queries = AnalyticsQueries::new(analytics.clone());

    match cli.command {
        Commands::Summary => println!("{}", queries.executive_summary().await?),
        Commands::Top { limit } => println!("{}", queries.top_performers(limit).await?),
        Commands::County { name } => println!("{}", queries.county_quick_stats(&name).await?),
        Commands::Compare { first, second } => {
            let comparison = analytics.compare_counties(&first, &second).await?;
            println!("{}", reporting::comparison_report(&comparison));
        }
        Commands::Range { min, max } => {
            for county in analytics.find_wards_in_range(min, max).await? {
                println!("{}: {} wards", county.region, county.ward_count);
            }
        }
        Commands::WardAt { lat, lng } => {
            match backend.find_ward_by_point(Point::new(lat, lng)).await? {
                Some(ward) => println!("{}", describe(&ward)),
                None => println!("No ward contains ({lat}, {lng})"),
            }
        }
        Commands::Nearest { lat, lng, limit } => {
            let point = Point::new(lat, lng);
            for (i, ward) in backend
                .find_nearest_wards(point, limit)
                .await?
                .iter()
                .enumerate()
            {
                let distance = kenya_geo_spatial::distance_km(&ward.geometry, point)?;
                println!("{}. {} - {distance:.2} km", i + 1, describe(ward));
            }
        }
        Commands::Boundary { ward } => {
            let boundary = analytics.boundary_analytics(&ward).await?;
            let bbox = boundary.bounding_box;
            println!("{} ({})", boundary.ward_name, boundary.county_name);
            println!("  Vertices:   {}", boundary.vertex_count);
            println!("  Complexity: {}", boundary.complexity);
            println!("  Area:       {:.2} km²", boundary.area_sq_km);
            println!("  Perimeter:  {:.2} km", boundary.perimeter_km);
            println!(
                "  Extent:     {:.5}..{:.5} lat, {:.5}..{:.5} lng",
                bbox.min_lat, bbox.max_lat, bbox.min_lng, bbox.max_lng
            );
        }
        Commands::Report { format } => {
            let report = analytics.generate_report().await?;
            println!("{}", reporting::render(&report, format)?);
        }
        Commands::Variance => println!("{}", queries.variance_summary().await?),
    }

    Ok(())
}
