#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics engine over ward boundary data.
//!
//! [`Analytics`] is bound to one [`DataAccess`] backend and derives every
//! result fresh from it on each call: nothing is cached between calls, so
//! percentages always use the backend's current ward total. Independent
//! per-county sub-queries are fanned out concurrently and recombined in
//! input order.
//!
//! [`queries::AnalyticsQueries`] composes engine calls into commonly
//! requested views, and [`reporting`] turns results into text, CSV and
//! JSON.
//!
//! [`DataAccess`]: kenya_geo_data_access::DataAccess

pub mod engine;
pub mod queries;
pub mod reporting;
pub mod stats;

use kenya_geo_data_access::DataAccessError;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use engine::{Analytics, DEFAULT_COMPLEXITY_THRESHOLD, DEFAULT_TOP_LIMIT};
pub use queries::AnalyticsQueries;

/// The kind of region a failed lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RegionKind {
    County,
    Constituency,
    SubCounty,
    Ward,
}

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A lookup by name found nothing.
    #[error("{kind} not found: {name}")]
    RegionNotFound {
        /// What was being looked up.
        kind: RegionKind,
        /// The name that was queried.
        name: String,
    },

    /// A ward's geometry has no vertices, so it cannot be measured.
    #[error("Ward {ward} has an empty geometry")]
    EmptyGeometry {
        /// Name of the ward.
        ward: String,
    },

    /// The backend failed. Passed through unchanged, never retried.
    #[error("Backend error: {0}")]
    Backend(#[from] DataAccessError),

    /// JSON export failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export failed.
    #[error("Export error: {message}")]
    Export {
        /// Description of what went wrong.
        message: String,
    },
}

impl AnalyticsError {
    pub(crate) fn not_found(kind: RegionKind, name: &str) -> Self {
        Self::RegionNotFound {
            kind,
            name: name.to_string(),
        }
    }
}
