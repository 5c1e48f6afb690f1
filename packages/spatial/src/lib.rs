#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry primitives for ward boundaries.
//!
//! Everything here works on [`Geometry`] as the boundary models define it
//! and converts to `geo` types internally. Distances are great-circle
//! (haversine) kilometres. Areas are spherical square kilometres.
//!
//! Containment is boundary-inclusive: a point lying exactly on any ring,
//! outer or hole, counts as contained. The same rule is used by
//! [`distance_km`], so a containing ward is always at distance zero.

pub mod index;

pub use index::BoundaryIndex;

use geo::{
    BoundingRect as _, Centroid as _, ChamberlainDuquetteArea as _, Closest, Coord,
    Distance as _, Haversine, HaversineClosestPoint as _, Intersects as _, Length as _,
    LineString, MultiPolygon, Polygon, Rect,
};
use kenya_geo_boundaries_models::{BoundingBox, Geometry, Point, Ring};
use thiserror::Error;

const METRES_PER_KM: f64 = 1_000.0;

/// Errors raised by geometry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The geometry has no rings, or only empty rings.
    #[error("Geometry has no vertices")]
    EmptyGeometry,
}

/// Total number of positions across every ring of every polygon.
#[must_use]
pub fn vertex_count(geometry: &Geometry) -> usize {
    geometry.rings().map(Vec::len).sum()
}

/// Extent of the geometry's outer rings across every polygon.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyGeometry`] if the geometry has no vertices.
pub fn bounding_box(geometry: &Geometry) -> Result<BoundingBox, GeometryError> {
    let rect = to_multi_polygon(geometry)
        .bounding_rect()
        .ok_or(GeometryError::EmptyGeometry)?;

    Ok(BoundingBox {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Returns `true` if `point` lies inside the outer ring of at least one
/// polygon and outside that polygon's holes. Points on a ring are inside.
#[must_use]
pub fn contains_point(geometry: &Geometry, point: Point) -> bool {
    to_multi_polygon(geometry).intersects(&to_geo_point(point))
}

/// Great-circle distance between two points in kilometres.
#[must_use]
pub fn haversine_distance_km(a: Point, b: Point) -> f64 {
    Haversine.distance(to_geo_point(a), to_geo_point(b)) / METRES_PER_KM
}

/// Great-circle distance from `point` to the nearest point of the
/// geometry's boundary, or `0.0` if the geometry contains the point.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyGeometry`] if the geometry has no vertices.
pub fn distance_km(geometry: &Geometry, point: Point) -> Result<f64, GeometryError> {
    multi_polygon_distance_km(&to_multi_polygon(geometry), point)
}

pub(crate) fn multi_polygon_distance_km(
    polygon: &MultiPolygon<f64>,
    point: Point,
) -> Result<f64, GeometryError> {
    let target = to_geo_point(point);
    if polygon.intersects(&target) {
        return Ok(0.0);
    }

    polygon
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .filter_map(|ring| ring_distance_m(ring, target))
        .reduce(f64::min)
        .map(|metres| metres / METRES_PER_KM)
        .ok_or(GeometryError::EmptyGeometry)
}

/// Metres from `target` to the closest point on the ring's great-circle
/// edges, or `None` for an empty ring.
fn ring_distance_m(ring: &LineString<f64>, target: geo::Point<f64>) -> Option<f64> {
    match ring.haversine_closest_point(&target) {
        Closest::Intersection(_) => Some(0.0),
        Closest::SinglePoint(nearest) => Some(Haversine.distance(target, nearest)),
        // Fewer than two vertices: no edge to project onto.
        Closest::Indeterminate => ring
            .points()
            .map(|vertex| Haversine.distance(target, vertex))
            .reduce(f64::min),
    }
}

/// Returns `true` if any part of the geometry touches the box. A box that
/// sits entirely inside a polygon intersects it.
#[must_use]
pub fn intersects_bounding_box(geometry: &Geometry, bbox: &BoundingBox) -> bool {
    to_multi_polygon(geometry).intersects(&to_rect(bbox))
}

/// Area-weighted centroid of the geometry.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyGeometry`] if the geometry has no vertices.
pub fn centroid(geometry: &Geometry) -> Result<Point, GeometryError> {
    to_multi_polygon(geometry)
        .centroid()
        .map(|c| Point::new(c.y(), c.x()))
        .ok_or(GeometryError::EmptyGeometry)
}

/// Spherical area in square kilometres, holes subtracted.
#[must_use]
pub fn area_sq_km(geometry: &Geometry) -> f64 {
    to_multi_polygon(geometry).chamberlain_duquette_unsigned_area() / 1_000_000.0
}

/// Sum of the haversine lengths of every ring.
#[must_use]
pub fn perimeter_km(geometry: &Geometry) -> f64 {
    geometry
        .rings()
        .map(|ring| Haversine.length(&to_line_string(ring)))
        .sum::<f64>()
        / METRES_PER_KM
}

/// Collects the polygons of several geometries into one `MultiPolygon`, so
/// that a whole region can be measured at once.
pub fn merge<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Geometry {
    Geometry::MultiPolygon(
        geometries
            .into_iter()
            .flat_map(|g| g.polygons().map(<[Ring]>::to_vec))
            .collect(),
    )
}

/// Converts to a `geo` [`MultiPolygon`] with `x = longitude`, `y = latitude`.
/// Polygons without any ring are dropped.
#[must_use]
pub fn to_multi_polygon(geometry: &Geometry) -> MultiPolygon<f64> {
    MultiPolygon(geometry.polygons().filter_map(to_polygon).collect())
}

fn to_polygon(rings: &[Ring]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(
        to_line_string(exterior),
        holes.iter().map(to_line_string).collect(),
    ))
}

fn to_line_string(ring: &Ring) -> LineString<f64> {
    ring.iter().map(|&[x, y]| Coord { x, y }).collect()
}

const fn to_geo_point(point: Point) -> geo::Point<f64> {
    geo::Point(Coord {
        x: point.longitude,
        y: point.latitude,
    })
}

fn to_rect(bbox: &BoundingBox) -> Rect<f64> {
    Rect::new(
        Coord {
            x: bbox.min_lng,
            y: bbox.min_lat,
        },
        Coord {
            x: bbox.max_lng,
            y: bbox.max_lat,
        },
    )
}

/// `[lng, lat]` envelope corners for the geometry, if it has any vertices.
pub(crate) fn envelope(polygon: &MultiPolygon<f64>) -> Option<([f64; 2], [f64; 2])> {
    polygon
        .bounding_rect()
        .map(|rect| ([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
