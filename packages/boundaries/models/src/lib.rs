#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary types.
//!
//! The ward is the leaf of the hierarchy and the only entity that carries a
//! geometry. Counties, constituencies and sub-counties are three independent
//! groupings over the same ward set, each carrying a ward count that is
//! either stored by the backend or derived from the wards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Point {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Axis-aligned extent in degrees. A box with equal min and max is a
/// single point and is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Builds a box from two opposite corners in any order, so the
    /// `min <= max` invariant always holds.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_lat: a.latitude.min(b.latitude),
            max_lat: a.latitude.max(b.latitude),
            min_lng: a.longitude.min(b.longitude),
            max_lng: a.longitude.max(b.longitude),
        }
    }

    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    #[must_use]
    pub const fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    #[must_use]
    pub const fn lng_range(&self) -> f64 {
        self.max_lng - self.min_lng
    }
}

/// A `[longitude, latitude]` pair, in `GeoJSON` axis order.
pub type Position = [f64; 2];

/// A closed sequence of positions. First and last coincide by convention;
/// this is not enforced.
pub type Ring = Vec<Position>;

/// Ward boundary geometry, serialized the same way as a `GeoJSON` geometry
/// object (`{"type": "Polygon", "coordinates": [...]}`).
///
/// For a polygon the first ring is the outer boundary and every following
/// ring is a hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Iterates the polygons of this geometry as ring slices. A `Polygon`
    /// yields itself once.
    pub fn polygons(&self) -> Box<dyn Iterator<Item = &[Ring]> + '_> {
        match self {
            Self::Polygon(rings) => Box::new(std::iter::once(rings.as_slice())),
            Self::MultiPolygon(polygons) => Box::new(polygons.iter().map(Vec::as_slice)),
        }
    }

    /// Iterates every ring across every polygon.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.polygons().flat_map(<[Ring]>::iter)
    }

    /// Iterates every vertex across every ring.
    pub fn positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.rings().flatten()
    }
}

/// The leaf administrative unit.
///
/// Owning region identities and names are denormalized onto the ward so
/// that a ward can be reported on without further lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ward {
    pub id: String,
    pub name: String,
    pub county_id: String,
    pub county_name: String,
    pub constituency_id: String,
    pub constituency_name: String,
    pub sub_county_id: String,
    pub sub_county_name: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct County {
    pub id: String,
    pub name: String,
    pub ward_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constituency {
    pub id: String,
    pub name: String,
    pub county_id: String,
    pub ward_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCounty {
    pub id: String,
    pub name: String,
    pub county_id: String,
    pub ward_count: u64,
}

/// Dataset-wide counts. Treated as the authoritative denominator for every
/// percentage the analytics layer computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    pub total_wards: u64,
    pub total_counties: u64,
    pub total_constituencies: u64,
}

/// A complete boundary snapshot as a backend holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub counties: Vec<County>,
    #[serde(default)]
    pub constituencies: Vec<Constituency>,
    #[serde(default)]
    pub sub_counties: Vec<SubCounty>,
    #[serde(default)]
    pub wards: Vec<Ward>,
}

impl Dataset {
    /// Derives the county, constituency and sub-county tables from the
    /// denormalized fields on each ward. Regions appear in the order their
    /// first ward does and their ward counts are exact.
    #[must_use]
    pub fn from_wards(wards: Vec<Ward>) -> Self {
        let mut counties = Tally::default();
        let mut constituencies = Tally::default();
        let mut sub_counties = Tally::default();

        for ward in &wards {
            counties.add(&ward.county_id, &ward.county_name, &ward.county_id);
            constituencies.add(
                &ward.constituency_id,
                &ward.constituency_name,
                &ward.county_id,
            );
            sub_counties.add(&ward.sub_county_id, &ward.sub_county_name, &ward.county_id);
        }

        Self {
            counties: counties
                .rows
                .into_iter()
                .map(|r| County {
                    id: r.id,
                    name: r.name,
                    ward_count: r.ward_count,
                })
                .collect(),
            constituencies: constituencies
                .rows
                .into_iter()
                .map(|r| Constituency {
                    id: r.id,
                    name: r.name,
                    county_id: r.county_id,
                    ward_count: r.ward_count,
                })
                .collect(),
            sub_counties: sub_counties
                .rows
                .into_iter()
                .map(|r| SubCounty {
                    id: r.id,
                    name: r.name,
                    county_id: r.county_id,
                    ward_count: r.ward_count,
                })
                .collect(),
            wards,
        }
    }
}

struct TallyRow {
    id: String,
    name: String,
    county_id: String,
    ward_count: u64,
}

#[derive(Default)]
struct Tally {
    positions: BTreeMap<String, usize>,
    rows: Vec<TallyRow>,
}

impl Tally {
    fn add(&mut self, id: &str, name: &str, county_id: &str) {
        if let Some(&pos) = self.positions.get(id) {
            self.rows[pos].ward_count += 1;
            return;
        }
        self.positions.insert(id.to_string(), self.rows.len());
        self.rows.push(TallyRow {
            id: id.to_string(),
            name: name.to_string(),
            county_id: county_id.to_string(),
            ward_count: 1,
        });
    }
}
