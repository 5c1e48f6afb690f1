//! `DuckDB` backend.
//!
//! Stores the boundary hierarchy in four tables with ward geometry as
//! `GeoJSON` TEXT (no spatial extension). Opening the database loads a
//! snapshot into a [`MemoryDataAccess`], which answers every query. Stored
//! ward counts may be `NULL`, in which case they are derived from the
//! `wards` table.

use std::collections::BTreeMap;
use std::path::Path;

use duckdb::Connection;
use kenya_geo_boundaries_models::{Constituency, County, Dataset, Geometry, SubCounty, Ward};

use crate::{DataAccessError, MemoryDataAccess};

/// Opens the database at `path`, ensures the schema exists and loads a
/// snapshot.
///
/// # Errors
///
/// Returns [`DataAccessError`] if the connection, schema creation or any
/// load query fails.
pub fn open(path: &Path) -> Result<MemoryDataAccess, DataAccessError> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(MemoryDataAccess::new(load(&conn)?))
}

/// Creates the boundary tables if they do not exist.
///
/// # Errors
///
/// Returns [`DataAccessError::DuckDb`] if a statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DataAccessError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS counties (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            ward_count BIGINT
        );

        CREATE TABLE IF NOT EXISTS constituencies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            county_id TEXT NOT NULL,
            ward_count BIGINT
        );

        CREATE TABLE IF NOT EXISTS sub_counties (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            county_id TEXT NOT NULL,
            ward_count BIGINT
        );

        CREATE TABLE IF NOT EXISTS wards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            county_id TEXT NOT NULL,
            constituency_id TEXT NOT NULL,
            sub_county_id TEXT NOT NULL,
            boundary_geojson TEXT NOT NULL
        );",
    )?;

    Ok(())
}

/// One region row before its ward count is resolved.
struct RegionRow {
    id: String,
    name: String,
    county_id: String,
    ward_count: Option<i64>,
}

/// Reads every table into a [`Dataset`].
///
/// # Errors
///
/// Returns [`DataAccessError`] if a query fails or a ward's stored
/// geometry is not valid `GeoJSON` geometry.
pub fn load(conn: &Connection) -> Result<Dataset, DataAccessError> {
    let counties = load_regions(conn, "SELECT id, name, id, ward_count FROM counties ORDER BY id")?;
    let constituencies = load_regions(
        conn,
        "SELECT id, name, county_id, ward_count FROM constituencies ORDER BY id",
    )?;
    let sub_counties = load_regions(
        conn,
        "SELECT id, name, county_id, ward_count FROM sub_counties ORDER BY id",
    )?;

    let names = |rows: &[RegionRow]| -> BTreeMap<String, String> {
        rows.iter()
            .map(|r| (r.id.clone(), r.name.clone()))
            .collect()
    };
    let county_names = names(&counties);
    let constituency_names = names(&constituencies);
    let sub_county_names = names(&sub_counties);

    let mut stmt = conn.prepare(
        "SELECT id, name, county_id, constituency_id, sub_county_id, boundary_geojson \
         FROM wards ORDER BY id",
    )?;
    let mut rows = stmt.query([])?;
    let mut wards = Vec::new();

    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let county_id: String = row.get(2)?;
        let constituency_id: String = row.get(3)?;
        let sub_county_id: String = row.get(4)?;
        let geojson: String = row.get(5)?;

        let geometry: Geometry =
            serde_json::from_str(&geojson).map_err(|e| DataAccessError::Conversion {
                message: format!("ward {id} has invalid boundary_geojson: {e}"),
            })?;

        wards.push(Ward {
            name: row.get(1)?,
            county_name: lookup(&county_names, &county_id),
            constituency_name: lookup(&constituency_names, &constituency_id),
            sub_county_name: lookup(&sub_county_names, &sub_county_id),
            id,
            county_id,
            constituency_id,
            sub_county_id,
            geometry,
        });
    }

    log::info!(
        "Loaded {} counties, {} constituencies, {} sub-counties and {} wards from DuckDB",
        counties.len(),
        constituencies.len(),
        sub_counties.len(),
        wards.len()
    );

    let by_county = count_by(&wards, |w| w.county_id.as_str());
    let by_constituency = count_by(&wards, |w| w.constituency_id.as_str());
    let by_sub_county = count_by(&wards, |w| w.sub_county_id.as_str());

    Ok(Dataset {
        counties: counties
            .into_iter()
            .map(|r| County {
                ward_count: resolve_count(&r, &by_county),
                id: r.id,
                name: r.name,
            })
            .collect(),
        constituencies: constituencies
            .into_iter()
            .map(|r| Constituency {
                ward_count: resolve_count(&r, &by_constituency),
                id: r.id,
                name: r.name,
                county_id: r.county_id,
            })
            .collect(),
        sub_counties: sub_counties
            .into_iter()
            .map(|r| SubCounty {
                ward_count: resolve_count(&r, &by_sub_county),
                id: r.id,
                name: r.name,
                county_id: r.county_id,
            })
            .collect(),
        wards,
    })
}

fn load_regions(conn: &Connection, query: &str) -> Result<Vec<RegionRow>, DataAccessError> {
    let mut stmt = conn.prepare(query)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        out.push(RegionRow {
            id: row.get(0)?,
            name: row.get(1)?,
            county_id: row.get(2)?,
            ward_count: row.get(3)?,
        });
    }

    Ok(out)
}

fn count_by(wards: &[Ward], key: impl Fn(&Ward) -> &str) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for ward in wards {
        *counts.entry(key(ward).to_string()).or_insert(0) += 1;
    }
    counts
}

fn lookup(names: &BTreeMap<String, String>, id: &str) -> String {
    names.get(id).cloned().unwrap_or_default()
}

#[allow(clippy::cast_sign_loss)]
fn resolve_count(row: &RegionRow, derived: &BTreeMap<String, u64>) -> u64 {
    row.ward_count.map_or_else(
        || derived.get(&row.id).copied().unwrap_or(0),
        |c| c.max(0) as u64,
    )
}
