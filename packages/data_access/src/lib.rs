#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data access contract for ward boundary queries.
//!
//! [`DataAccess`] is the only boundary between the analytics engine and a
//! storage technology. Every backend answers against a fixed dataset
//! snapshot and follows the same conventions:
//!
//! * Name lookups are exact and case-insensitive.
//! * Single-entity lookups return `Ok(None)` when nothing matches.
//! * Collection lookups return an empty `Vec` when nothing matches.
//! * Proximity is measured in haversine kilometres from the query point to
//!   the nearest point on the ward boundary, and is `0` for the ward that
//!   contains the point (see [`kenya_geo_spatial::distance_km`]).
//!
//! Backends are picked explicitly through [`BackendConfig`] and [`create`].

pub mod config;
pub mod fixture;
pub mod memory;

#[cfg(feature = "duckdb")]
pub mod boundaries_db;

use std::sync::Arc;

use async_trait::async_trait;
use kenya_geo_boundaries_models::{
    BoundingBox, Constituency, County, DatasetStatistics, Point, SubCounty, Ward,
};
use thiserror::Error;

pub use config::BackendConfig;
pub use memory::MemoryDataAccess;

/// Errors that can occur inside a storage backend.
///
/// The analytics layer never inspects these; it propagates them as-is.
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// Opaque backend failure.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of what went wrong.
        message: String,
    },

    /// `DuckDB` query failed.
    #[cfg(feature = "duckdb")]
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Reading a fixture or config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parsing failed.
    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Query surface a storage backend exposes over one dataset snapshot.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// The ward whose geometry contains `point`, boundary inclusive. When
    /// several wards match (for example a point on a shared edge) the ward
    /// with the lexicographically smallest id wins.
    async fn find_ward_by_point(&self, point: Point) -> Result<Option<Ward>, DataAccessError>;

    /// Up to `limit` wards ordered by ascending distance from `point`.
    /// Equal distances are ordered by ward id.
    async fn find_nearest_wards(
        &self,
        point: Point,
        limit: usize,
    ) -> Result<Vec<Ward>, DataAccessError>;

    /// Every ward within `distance_km` of `point`, in dataset order.
    async fn find_wards_within_distance(
        &self,
        point: Point,
        distance_km: f64,
    ) -> Result<Vec<Ward>, DataAccessError>;

    /// Every ward of the county named `county_name`.
    async fn find_wards_by_county(&self, county_name: &str) -> Result<Vec<Ward>, DataAccessError>;

    /// Every ward whose geometry intersects `bbox`, in dataset order.
    async fn find_wards_in_bounding_box(
        &self,
        bbox: BoundingBox,
    ) -> Result<Vec<Ward>, DataAccessError>;

    async fn find_ward_by_name(&self, name: &str) -> Result<Option<Ward>, DataAccessError>;

    async fn get_all_counties(&self) -> Result<Vec<County>, DataAccessError>;

    async fn get_county_by_name(&self, name: &str) -> Result<Option<County>, DataAccessError>;

    async fn get_constituencies_by_county(
        &self,
        county_name: &str,
    ) -> Result<Vec<Constituency>, DataAccessError>;

    async fn get_sub_counties_by_county(
        &self,
        county_name: &str,
    ) -> Result<Vec<SubCounty>, DataAccessError>;

    /// Dataset-wide totals, always computed from the current snapshot.
    async fn get_statistics(&self) -> Result<DatasetStatistics, DataAccessError>;
}

/// Builds the backend named by `config`.
///
/// # Errors
///
/// Returns [`DataAccessError`] if the backend's data cannot be loaded, or if
/// the config names a backend this build does not include.
pub fn create(config: &BackendConfig) -> Result<Arc<dyn DataAccess>, DataAccessError> {
    match config {
        BackendConfig::Memory { fixture, dataset } => {
            let backend = match (fixture, dataset) {
                (Some(_), Some(_)) => {
                    return Err(DataAccessError::Conversion {
                        message: "memory backend takes either `fixture` or `dataset`, not both"
                            .to_string(),
                    });
                }
                (Some(path), None) => MemoryDataAccess::from_wards(fixture::load_geojson(path)?),
                (None, Some(path)) => MemoryDataAccess::new(fixture::load_dataset(path)?),
                (None, None) => MemoryDataAccess::default(),
            };
            log::info!("Using in-memory backend ({} wards)", backend.ward_count());
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "duckdb")]
        BackendConfig::DuckDb { path } => {
            let backend = boundaries_db::open(path)?;
            log::info!(
                "Using DuckDB backend at {} ({} wards)",
                path.display(),
                backend.ward_count()
            );
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "duckdb"))]
        BackendConfig::DuckDb { path } => Err(DataAccessError::Backend {
            message: format!(
                "cannot open {}: built without the `duckdb` feature",
                path.display()
            ),
        }),
    }
}

/// Exact, case-insensitive name comparison used by every backend.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
