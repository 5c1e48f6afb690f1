//! R-tree over ward boundaries.
//!
//! Geometries are converted to `geo` polygons once, at build time, and
//! stored alongside their envelope. Every lookup returns positions into the
//! slice the index was built from, ascending, so callers can map results
//! back to their own records and get a stable order.

use geo::{Intersects as _, MultiPolygon};
use kenya_geo_boundaries_models::{BoundingBox, Geometry, Point};
use rstar::{AABB, RTree, RTreeObject};

use crate::{multi_polygon_distance_km, to_geo_point, to_multi_polygon, to_rect};

/// A boundary polygon stored in the R-tree with its source position.
struct BoundaryEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over a fixed list of geometries.
pub struct BoundaryIndex {
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Builds the index. Geometries without any vertex are left out and
    /// never match a spatial query.
    pub fn new<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Self {
        let mut entries = Vec::new();

        for (position, geometry) in geometries.into_iter().enumerate() {
            let polygon = to_multi_polygon(geometry);
            let Some((min, max)) = crate::envelope(&polygon) else {
                log::warn!("Skipping empty geometry at position {position} in boundary index");
                continue;
            };

            entries.push(BoundaryEntry {
                position,
                envelope: AABB::from_corners(min, max),
                polygon,
            });
        }

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed (non-empty) geometries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Positions of every geometry containing `point`, boundary inclusive.
    #[must_use]
    pub fn containing(&self, point: Point) -> Vec<usize> {
        let target = to_geo_point(point);
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&target))
            .map(|entry| entry.position)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Positions of every geometry that intersects the box. The R-tree
    /// narrows candidates by envelope and each candidate is then tested
    /// against its actual polygon.
    #[must_use]
    pub fn intersecting(&self, bbox: &BoundingBox) -> Vec<usize> {
        let rect = to_rect(bbox);
        let query_env = AABB::from_corners(
            [bbox.min_lng, bbox.min_lat],
            [bbox.max_lng, bbox.max_lat],
        );

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&rect))
            .map(|entry| entry.position)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Great-circle distance in kilometres from `point` to every indexed
    /// geometry, as `(position, distance)` ascending by position.
    #[must_use]
    pub fn distances(&self, point: Point) -> Vec<(usize, f64)> {
        let mut out: Vec<(usize, f64)> = self
            .tree
            .iter()
            .filter_map(|entry| {
                multi_polygon_distance_km(&entry.polygon, point)
                    .ok()
                    .map(|d| (entry.position, d))
            })
            .collect();
        out.sort_unstable_by_key(|(position, _)| *position);
        out
    }
}
