//! Loading ward fixtures from disk.
//!
//! Ward fixtures are `GeoJSON` `FeatureCollection`s. Each feature carries a
//! `Polygon` or `MultiPolygon` geometry and these properties:
//!
//! | property | |
//! |---|---|
//! | `id` | ward id (falls back to the feature id) |
//! | `name` | ward name |
//! | `countyId`, `countyName` | owning county |
//! | `constituencyId`, `constituencyName` | owning constituency |
//! | `subCountyId`, `subCountyName` | owning sub-county |
//!
//! Features with any other geometry type, or with no geometry, are skipped.

use std::path::Path;

use geojson::{Feature, GeoJson, Value, feature::Id};
use kenya_geo_boundaries_models::{Dataset, Geometry, Position, Ring, Ward};
use serde_json::Value as JsonValue;

use crate::DataAccessError;

/// Reads a ward `FeatureCollection` from `path`.
///
/// # Errors
///
/// Returns [`DataAccessError`] if the file cannot be read or is not a valid
/// `FeatureCollection` of wards.
pub fn load_geojson(path: &Path) -> Result<Vec<Ward>, DataAccessError> {
    let contents = std::fs::read_to_string(path)?;
    let wards = parse_geojson(&contents)?;
    log::info!("Loaded {} wards from {}", wards.len(), path.display());
    Ok(wards)
}

/// Reads a JSON-serialized [`Dataset`] from `path`.
///
/// # Errors
///
/// Returns [`DataAccessError`] if the file cannot be read or parsed.
pub fn load_dataset(path: &Path) -> Result<Dataset, DataAccessError> {
    let contents = std::fs::read_to_string(path)?;
    let dataset: Dataset = serde_json::from_str(&contents)?;
    log::info!(
        "Loaded dataset from {} ({} counties, {} wards)",
        path.display(),
        dataset.counties.len(),
        dataset.wards.len()
    );
    Ok(dataset)
}

/// Parses a ward `FeatureCollection`.
///
/// # Errors
///
/// Returns [`DataAccessError`] if the text is not `GeoJSON`, is not a
/// `FeatureCollection`, or a polygon feature lacks a required property.
pub fn parse_geojson(contents: &str) -> Result<Vec<Ward>, DataAccessError> {
    let geojson: GeoJson = contents.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(DataAccessError::Conversion {
            message: "expected a GeoJSON FeatureCollection".to_string(),
        });
    };

    let mut wards = Vec::with_capacity(collection.features.len());

    for (i, feature) in collection.features.iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref().and_then(|g| to_geometry(&g.value))
        else {
            log::warn!("Skipping feature {i}: geometry is missing or not a polygon");
            continue;
        };

        let id = string_property(feature, "id")
            .or_else(|| feature_id(feature))
            .ok_or_else(|| missing(i, "id"))?;

        wards.push(Ward {
            name: required(feature, i, "name")?,
            county_id: required(feature, i, "countyId")?,
            county_name: required(feature, i, "countyName")?,
            constituency_id: required(feature, i, "constituencyId")?,
            constituency_name: required(feature, i, "constituencyName")?,
            sub_county_id: required(feature, i, "subCountyId")?,
            sub_county_name: required(feature, i, "subCountyName")?,
            id,
            geometry,
        });
    }

    Ok(wards)
}

fn to_geometry(value: &Value) -> Option<Geometry> {
    match value {
        Value::Polygon(rings) => Some(Geometry::Polygon(to_rings(rings))),
        Value::MultiPolygon(polygons) => Some(Geometry::MultiPolygon(
            polygons.iter().map(|rings| to_rings(rings)).collect(),
        )),
        _ => None,
    }
}

fn to_rings(rings: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| ring.iter().filter_map(|p| to_position(p)).collect())
        .collect()
}

fn to_position(position: &[f64]) -> Option<Position> {
    match position {
        [lng, lat, ..] => Some([*lng, *lat]),
        _ => None,
    }
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn feature_id(feature: &Feature) -> Option<String> {
    match feature.id.as_ref()? {
        Id::String(s) => Some(s.clone()),
        Id::Number(n) => Some(n.to_string()),
    }
}

fn required(feature: &Feature, index: usize, key: &str) -> Result<String, DataAccessError> {
    string_property(feature, key).ok_or_else(|| missing(index, key))
}

fn missing(index: usize, key: &str) -> DataAccessError {
    DataAccessError::Conversion {
        message: format!("feature {index} is missing property `{key}`"),
    }
}
