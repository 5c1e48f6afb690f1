//! In-memory backend.
//!
//! Holds one immutable [`Dataset`] snapshot and a [`BoundaryIndex`] over
//! its ward geometries. Also serves as the query layer for the `DuckDB`
//! backend, which loads its tables into a snapshot at open time.

use async_trait::async_trait;
use kenya_geo_boundaries_models::{
    BoundingBox, Constituency, County, Dataset, DatasetStatistics, Point, SubCounty, Ward,
};
use kenya_geo_spatial::BoundaryIndex;

use crate::{DataAccess, DataAccessError, names_match};

/// A fully in-memory [`DataAccess`] implementation.
pub struct MemoryDataAccess {
    dataset: Dataset,
    index: BoundaryIndex,
}

impl Default for MemoryDataAccess {
    fn default() -> Self {
        Self::new(Dataset::default())
    }
}

impl MemoryDataAccess {
    /// Wraps a dataset. If it has wards but no county table, the region
    /// tables are derived from the wards.
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        let dataset = if dataset.counties.is_empty() && !dataset.wards.is_empty() {
            Dataset::from_wards(dataset.wards)
        } else {
            dataset
        };

        let index = BoundaryIndex::new(dataset.wards.iter().map(|w| &w.geometry));
        log::debug!(
            "Indexed {} of {} ward geometries",
            index.len(),
            dataset.wards.len()
        );

        Self { dataset, index }
    }

    /// Builds a backend from wards alone, deriving every region table and
    /// ward count from the wards' denormalized fields.
    #[must_use]
    pub fn from_wards(wards: Vec<Ward>) -> Self {
        Self::new(Dataset::from_wards(wards))
    }

    /// Number of wards with a geometry record (indexed or not).
    #[must_use]
    pub fn ward_count(&self) -> usize {
        self.dataset.wards.len()
    }

    fn county_named(&self, name: &str) -> Option<&County> {
        self.dataset
            .counties
            .iter()
            .find(|c| names_match(&c.name, name))
    }

    /// `(position, distance_km)` for every ward with a usable geometry.
    fn distances(&self, point: Point) -> Vec<(usize, f64)> {
        self.index.distances(point)
    }

    fn wards_at(&self, positions: impl IntoIterator<Item = usize>) -> Vec<Ward> {
        positions
            .into_iter()
            .filter_map(|p| self.dataset.wards.get(p).cloned())
            .collect()
    }
}

#[async_trait]
impl DataAccess for MemoryDataAccess {
    async fn find_ward_by_point(&self, point: Point) -> Result<Option<Ward>, DataAccessError> {
        let hits = self.index.containing(point);
        if hits.len() > 1 {
            log::debug!(
                "{} wards contain ({}, {}); picking the smallest id",
                hits.len(),
                point.latitude,
                point.longitude
            );
        }

        Ok(hits
            .into_iter()
            .filter_map(|p| self.dataset.wards.get(p))
            .min_by(|a, b| a.id.cmp(&b.id))
            .cloned())
    }

    async fn find_nearest_wards(
        &self,
        point: Point,
        limit: usize,
    ) -> Result<Vec<Ward>, DataAccessError> {
        let wards = &self.dataset.wards;
        let mut distances = self.distances(point);
        distances.sort_by(|(pa, da), (pb, db)| {
            da.total_cmp(db)
                .then_with(|| wards[*pa].id.cmp(&wards[*pb].id))
        });

        Ok(self.wards_at(distances.into_iter().take(limit).map(|(p, _)| p)))
    }

    async fn find_wards_within_distance(
        &self,
        point: Point,
        distance_km: f64,
    ) -> Result<Vec<Ward>, DataAccessError> {
        let positions = self
            .distances(point)
            .into_iter()
            .filter(|(_, d)| *d <= distance_km)
            .map(|(p, _)| p);

        Ok(self.wards_at(positions))
    }

    async fn find_wards_by_county(&self, county_name: &str) -> Result<Vec<Ward>, DataAccessError> {
        let Some(county) = self.county_named(county_name) else {
            return Ok(vec![]);
        };

        Ok(self
            .dataset
            .wards
            .iter()
            .filter(|w| w.county_id == county.id)
            .cloned()
            .collect())
    }

    async fn find_wards_in_bounding_box(
        &self,
        bbox: BoundingBox,
    ) -> Result<Vec<Ward>, DataAccessError> {
        Ok(self.wards_at(self.index.intersecting(&bbox)))
    }

    async fn find_ward_by_name(&self, name: &str) -> Result<Option<Ward>, DataAccessError> {
        Ok(self
            .dataset
            .wards
            .iter()
            .find(|w| names_match(&w.name, name))
            .cloned())
    }

    async fn get_all_counties(&self) -> Result<Vec<County>, DataAccessError> {
        Ok(self.dataset.counties.clone())
    }

    async fn get_county_by_name(&self, name: &str) -> Result<Option<County>, DataAccessError> {
        Ok(self.county_named(name).cloned())
    }

    async fn get_constituencies_by_county(
        &self,
        county_name: &str,
    ) -> Result<Vec<Constituency>, DataAccessError> {
        let Some(county) = self.county_named(county_name) else {
            return Ok(vec![]);
        };

        Ok(self
            .dataset
            .constituencies
            .iter()
            .filter(|c| c.county_id == county.id)
            .cloned()
            .collect())
    }

    async fn get_sub_counties_by_county(
        &self,
        county_name: &str,
    ) -> Result<Vec<SubCounty>, DataAccessError> {
        let Some(county) = self.county_named(county_name) else {
            return Ok(vec![]);
        };

        Ok(self
            .dataset
            .sub_counties
            .iter()
            .filter(|s| s.county_id == county.id)
            .cloned()
            .collect())
    }

    async fn get_statistics(&self) -> Result<DatasetStatistics, DataAccessError> {
        Ok(DatasetStatistics {
            total_wards: self.dataset.counties.iter().map(|c| c.ward_count).sum(),
            total_counties: self.dataset.counties.len() as u64,
            total_constituencies: self.dataset.constituencies.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use kenya_geo_boundaries_models::Geometry;

    use super::*;

    fn square(lat: f64, lng: f64, size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            [lng, lat],
            [lng + size, lat],
            [lng + size, lat + size],
            [lng, lat + size],
            [lng, lat],
        ]])
    }

    fn ward(id: &str, name: &str, county: (&str, &str), geometry: Geometry) -> Ward {
        Ward {
            id: id.to_string(),
            name: name.to_string(),
            county_id: county.0.to_string(),
            county_name: county.1.to_string(),
            constituency_id: format!("{}-c", county.0),
            constituency_name: format!("{} Central", county.1),
            sub_county_id: format!("{}-s{id}", county.0),
            sub_county_name: format!("{} Sub {id}", county.1),
            geometry,
        }
    }

    /// Three 0.1 degree wards side by side in "Nairobi" plus one far away
    /// in "Mombasa".
    fn backend() -> MemoryDataAccess {
        let nairobi = ("47", "Nairobi");
        let mombasa = ("1", "Mombasa");
        MemoryDataAccess::from_wards(vec![
            ward("w2", "Kilimani", nairobi, square(-1.3, 36.7, 0.1)),
            ward("w1", "Kileleshwa", nairobi, square(-1.3, 36.8, 0.1)),
            ward("w3", "Parklands", nairobi, square(-1.3, 36.9, 0.1)),
            ward("w4", "Nyali", mombasa, square(-4.1, 39.7, 0.1)),
            ward("w5", "Empty", mombasa, Geometry::Polygon(vec![])),
        ])
    }

    #[tokio::test]
    async fn point_lookup_finds_containing_ward() {
        let db = backend();
        let ward = db
            .find_ward_by_point(Point::new(-1.25, 36.75))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ward.name, "Kilimani");

        assert!(
            db.find_ward_by_point(Point::new(10.0, 10.0))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn point_on_shared_edge_picks_smallest_id() {
        let db = backend();
        // Edge between w2 (Kilimani) and w1 (Kileleshwa).
        let ward = db
            .find_ward_by_point(Point::new(-1.25, 36.8))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ward.id, "w1");
    }

    #[tokio::test]
    async fn nearest_is_ordered_and_consistent_with_containment() {
        let db = backend();
        let point = Point::new(-1.25, 36.75);

        let nearest = db.find_nearest_wards(point, 10).await.unwrap();
        let ids: Vec<&str> = nearest.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w2", "w1", "w3", "w4"]);

        let containing = db.find_ward_by_point(point).await.unwrap().unwrap();
        assert_eq!(nearest[0].id, containing.id);

        assert_eq!(db.find_nearest_wards(point, 2).await.unwrap().len(), 2);
        assert!(db.find_nearest_wards(point, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nearest_ranks_by_great_circle_distance() {
        let norway = ("60", "Nordland");
        let db = MemoryDataAccess::from_wards(vec![
            // Thin ward running diagonally from (58N, 1E) to (62N, 3E).
            ward(
                "a",
                "Sliver",
                norway,
                Geometry::Polygon(vec![vec![
                    [1.0, 58.0],
                    [3.0, 62.0],
                    [3.01, 62.0],
                    [1.01, 58.0],
                    [1.0, 58.0],
                ]]),
            ),
            // Top edge ~115.5 km due south of the query point.
            ward("b", "Square", norway, square(58.0, -0.5, 0.96)),
        ]);

        // The sliver's closest edge point is ~104.9 km away along the great
        // circle, though ~126.6 km if projected in raw degrees.
        let nearest = db.find_nearest_wards(Point::new(60.0, 0.0), 2).await.unwrap();
        let ids: Vec<&str> = nearest.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let within = db
            .find_wards_within_distance(Point::new(60.0, 0.0), 110.0)
            .await
            .unwrap();
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].id, "a");
    }

    #[tokio::test]
    async fn within_distance_is_stable() {
        let db = backend();
        let point = Point::new(-1.25, 36.75);

        // Kileleshwa's edge is ~5.5 km away, Parklands' ~16.7 km.
        let near = db.find_wards_within_distance(point, 10.0).await.unwrap();
        let ids: Vec<&str> = near.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w2", "w1"]);

        let again = db.find_wards_within_distance(point, 10.0).await.unwrap();
        assert_eq!(near, again);

        let all = db.find_wards_within_distance(point, 1_000.0).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn bounding_box_intersects_geometry() {
        let db = backend();
        let bbox = BoundingBox::from_corners(Point::new(-1.28, 36.85), Point::new(-1.22, 36.95));
        let ids: Vec<String> = db
            .find_wards_in_bounding_box(bbox)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["w1", "w3"]);
    }

    #[tokio::test]
    async fn name_lookups_are_case_insensitive() {
        let db = backend();
        assert_eq!(
            db.find_ward_by_name("NYALI").await.unwrap().unwrap().id,
            "w4"
        );
        assert!(db.find_ward_by_name("Nyal").await.unwrap().is_none());

        let county = db.get_county_by_name("nairobi").await.unwrap().unwrap();
        assert_eq!(county.ward_count, 3);
        assert!(db.get_county_by_name("Kisumu").await.unwrap().is_none());

        assert_eq!(db.find_wards_by_county("MOMBASA").await.unwrap().len(), 2);
        assert!(db.find_wards_by_county("Kisumu").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hierarchy_lookups() {
        let db = backend();
        assert_eq!(
            db.get_constituencies_by_county("Nairobi")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            db.get_sub_counties_by_county("Nairobi").await.unwrap().len(),
            3
        );
        assert!(
            db.get_sub_counties_by_county("Kisumu")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn statistics_match_tables() {
        let db = backend();
        let stats = db.get_statistics().await.unwrap();
        assert_eq!(stats.total_wards, 5);
        assert_eq!(stats.total_counties, 2);
        assert_eq!(stats.total_constituencies, 2);
    }

    #[tokio::test]
    async fn tabular_dataset_keeps_stored_counts() {
        let db = MemoryDataAccess::new(Dataset {
            counties: vec![
                County {
                    id: "1".to_string(),
                    name: "Nairobi".to_string(),
                    ward_count: 85,
                },
                County {
                    id: "4".to_string(),
                    name: "Mombasa".to_string(),
                    ward_count: 42,
                },
            ],
            ..Dataset::default()
        });

        let stats = db.get_statistics().await.unwrap();
        assert_eq!(stats.total_wards, 127);
        assert!(db.find_wards_by_county("Nairobi").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn loads_geojson_fixture() {
        let wards = crate::fixture::parse_geojson(crate::fixture::tests::WARDS_GEOJSON).unwrap();
        let db = MemoryDataAccess::from_wards(wards);

        let ward = db
            .find_ward_by_point(Point::new(-1.29, 36.79))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ward.name, "Kilimani");
        assert_eq!(db.get_all_counties().await.unwrap().len(), 2);
    }
}
