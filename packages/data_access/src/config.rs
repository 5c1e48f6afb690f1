//! Backend selection.
//!
//! A config file is a small TOML document naming one backend:
//!
//! ```toml
//! [backend]
//! type = "memory"
//! fixture = "data/wards.geojson"
//! ```
//!
//! or
//!
//! ```toml
//! [backend]
//! type = "duck_db"
//! path = "data/boundaries.duckdb"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::DataAccessError;

/// Which storage backend to build, and where its data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Everything held in memory. Seeded from at most one of a `GeoJSON`
    /// ward `FeatureCollection` or a JSON-serialized dataset; empty when
    /// neither is given.
    Memory {
        #[serde(default)]
        fixture: Option<PathBuf>,
        #[serde(default)]
        dataset: Option<PathBuf>,
    },
    /// A `DuckDB` file holding the boundary tables.
    DuckDb { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConfigFile {
    backend: BackendConfig,
}

impl BackendConfig {
    /// Parses a config document.
    ///
    /// # Errors
    ///
    /// Returns [`DataAccessError::Toml`] if the document is malformed.
    pub fn parse(contents: &str) -> Result<Self, DataAccessError> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.backend)
    }

    /// Reads and parses a config file. Relative data paths are resolved
    /// against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`DataAccessError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DataAccessError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };

        match self {
            Self::Memory { fixture, dataset } => Self::Memory {
                fixture: fixture.map(resolve),
                dataset: dataset.map(resolve),
            },
            Self::DuckDb { path } => Self::DuckDb {
                path: resolve(path),
            },
        }
    }
}
