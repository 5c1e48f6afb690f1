#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result records produced by the analytics engine.
//!
//! These are plain data: the engine builds them, formatters and exporters
//! read them. Percentages are `f64` in the range `0..=100` and are never
//! rounded at this layer.

use chrono::{DateTime, Utc};
use kenya_geo_boundaries_models::BoundingBox;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Vertex count below which a boundary is [`Complexity::Simple`].
pub const MODERATE_VERTEX_THRESHOLD: usize = 50;

/// Vertex count at which a boundary becomes [`Complexity::Complex`].
pub const COMPLEX_VERTEX_THRESHOLD: usize = 200;

/// Coarse boundary shape classification by vertex count.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Complexity {
    /// Fewer than 50 vertices.
    Simple,
    /// 50 to 199 vertices.
    Moderate,
    /// 200 vertices or more.
    Complex,
}

impl Complexity {
    #[must_use]
    pub const fn from_vertex_count(vertex_count: usize) -> Self {
        if vertex_count < MODERATE_VERTEX_THRESHOLD {
            Self::Simple
        } else if vertex_count < COMPLEX_VERTEX_THRESHOLD {
            Self::Moderate
        } else {
            Self::Complex
        }
    }
}

/// A county reduced to its name and ward count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountySize {
    pub name: String,
    pub ward_count: u64,
}

/// Dataset-wide overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub total_wards: u64,
    pub total_counties: u64,
    pub total_constituencies: u64,
    pub total_sub_counties: u64,
    /// `round(total_wards / total_counties)`, `0` when there are no counties.
    pub average_wards_per_county: u64,
    /// `round(total_wards / total_constituencies)`, `0` when there are no
    /// constituencies.
    pub average_wards_per_constituency: u64,
    /// County with the most wards; the first one in dataset order on a tie.
    /// `None` only when the dataset has no counties.
    pub largest_county: Option<CountySize>,
    /// County with the fewest wards; the last one in dataset order on a tie.
    pub smallest_county: Option<CountySize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyAnalytics {
    pub county_name: String,
    pub ward_count: u64,
    pub constituency_count: u64,
    pub sub_county_count: u64,
    /// Share of the national ward total.
    pub percentage_of_total_wards: f64,
    /// Mean spherical area of the county's wards that have a geometry.
    pub average_ward_area_sq_km: Option<f64>,
    /// Extent of the county's ward geometries.
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituencyAnalytics {
    pub constituency_name: String,
    pub county_name: String,
    pub ward_count: u64,
    /// Sub-counties of the owning county. Constituencies and sub-counties
    /// are parallel hierarchies, so this is a county-level figure.
    pub sub_county_count: u64,
    /// Share of the owning county's wards, not the national total.
    pub percentage_of_county_wards: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryAnalytics {
    pub ward_name: String,
    pub county_name: String,
    pub constituency_name: String,
    pub bounding_box: BoundingBox,
    pub vertex_count: usize,
    pub area_sq_km: f64,
    pub perimeter_km: f64,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardDifference {
    /// `a.ward_count - b.ward_count`.
    pub ward_difference: i64,
    /// `ward_difference / b.ward_count * 100`, truncated toward zero. `0`
    /// when `b` has no wards.
    pub percentage_difference: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyComparison {
    pub county1: CountyAnalytics,
    pub county2: CountyAnalytics,
    pub difference: WardDifference,
}

/// Lightweight `(name, ward count)` pair returned by range filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionWardCount {
    pub region: String,
    pub ward_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCenter {
    pub center_lat: f64,
    pub center_lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSpread {
    pub lat_range: f64,
    pub lng_range: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialDistribution {
    pub region: String,
    pub ward_count: u64,
    /// Area-weighted centroid of the region's ward geometries.
    pub coordinates: RegionCenter,
    pub spread: RegionSpread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityAnalytics {
    pub region: String,
    /// Wards per 1,000 km², `0` when the area is zero.
    pub ward_density: f64,
    pub area_sq_km: f64,
    pub ward_count: u64,
}

/// Dispersion of ward counts across counties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceAnalysis {
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub std_dev: f64,
    /// `std_dev / mean * 100`, `0` when the mean is zero.
    pub coefficient_of_variation: f64,
    /// `std_dev / mean > 0.5`.
    pub high_variation: bool,
    /// Largest county has more than five times the wards of the smallest.
    pub significant_disparity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountiesBySize {
    /// 50 to 1,000 wards.
    pub large: Vec<RegionWardCount>,
    /// 20 to 49 wards.
    pub medium: Vec<RegionWardCount>,
    /// 1 to 19 wards.
    pub small: Vec<RegionWardCount>,
}

/// Immutable snapshot of every headline analysis, taken at `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub metrics: AnalyticsMetrics,
    pub county_breakdown: Vec<CountyAnalytics>,
    pub top_counties_by_wards: Vec<CountyAnalytics>,
    pub spatial_distribution: Vec<SpatialDistribution>,
    pub density_analysis: Vec<DensityAnalytics>,
}
