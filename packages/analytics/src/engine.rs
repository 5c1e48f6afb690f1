//! The [`Analytics`] engine.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use kenya_geo_analytics_models::{
    AnalyticsMetrics, AnalyticsReport, BoundaryAnalytics, COMPLEX_VERTEX_THRESHOLD, Complexity,
    ConstituencyAnalytics, CountyAnalytics, CountyComparison, CountySize, DensityAnalytics,
    RegionCenter, RegionSpread, RegionWardCount, SpatialDistribution, VarianceAnalysis,
    WardDifference,
};
use kenya_geo_boundaries_models::{BoundingBox, County, Geometry, Ward};
use kenya_geo_data_access::{DataAccess, names_match};

use crate::{AnalyticsError, RegionKind, stats};

/// Number of counties [`Analytics::top_counties_by_wards`] returns in a
/// report.
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Default vertex threshold for [`Analytics::complex_boundaries`].
pub const DEFAULT_COMPLEXITY_THRESHOLD: usize = COMPLEX_VERTEX_THRESHOLD;

/// Largest / smallest county ratio above which counties count as
/// significantly unequal.
const DISPARITY_RATIO: f64 = 5.0;

/// Coefficient of variation (as a fraction) above which ward counts count
/// as highly varied.
const HIGH_VARIATION: f64 = 0.5;

/// Statistical queries over one [`DataAccess`] backend.
///
/// Holds no state besides the backend handle, so clones are cheap and
/// calls may run concurrently.
#[derive(Clone)]
pub struct Analytics {
    data_access: Arc<dyn DataAccess>,
}

/// A region's ward geometries merged for measurement.
struct RegionGeometry {
    name: String,
    ward_count: u64,
    geometry: Geometry,
    bounding_box: BoundingBox,
}

impl Analytics {
    #[must_use]
    pub fn new(data_access: Arc<dyn DataAccess>) -> Self {
        Self { data_access }
    }

    /// Dataset-wide totals, averages and the largest and smallest county.
    ///
    /// Counties are ranked with a stable descending sort on ward count, so on
    /// a tie the largest county is the first one the backend lists and the
    /// smallest is the last one.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Backend`] if a backend call fails.
    pub async fn metrics(&self) -> Result<AnalyticsMetrics, AnalyticsError> {
        let totals = self.data_access.get_statistics().await?;
        let mut counties = self.data_access.get_all_counties().await?;

        let sub_counties = try_join_all(
            counties
                .iter()
                .map(|c| self.data_access.get_sub_counties_by_county(&c.name)),
        )
        .await?;

        counties.sort_by(|a, b| b.ward_count.cmp(&a.ward_count));
        let size = |c: &County| CountySize {
            name: c.name.clone(),
            ward_count: c.ward_count,
        };

        Ok(AnalyticsMetrics {
            total_wards: totals.total_wards,
            total_counties: totals.total_counties,
            total_constituencies: totals.total_constituencies,
            total_sub_counties: sub_counties.iter().map(Vec::len).sum::<usize>() as u64,
            average_wards_per_county: stats::rounded_average(
                totals.total_wards,
                totals.total_counties,
            ),
            average_wards_per_constituency: stats::rounded_average(
                totals.total_wards,
                totals.total_constituencies,
            ),
            largest_county: counties.first().map(size),
            smallest_county: counties.last().map(size),
        })
    }

    /// Analytics for the county named `county_name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if no county has that name
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn county_analytics(
        &self,
        county_name: &str,
    ) -> Result<CountyAnalytics, AnalyticsError> {
        let county = self.county(county_name).await?;
        let totals = self.data_access.get_statistics().await?;

        self.county_record(&county, totals.total_wards).await
    }

    /// Analytics for every county, in backend order. Each county's
    /// sub-queries run concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Backend`] if any backend call fails.
    pub async fn all_county_analytics(&self) -> Result<Vec<CountyAnalytics>, AnalyticsError> {
        let counties = self.data_access.get_all_counties().await?;
        let totals = self.data_access.get_statistics().await?;

        log::debug!("Computing analytics for {} counties", counties.len());

        try_join_all(
            counties
                .iter()
                .map(|c| self.county_record(c, totals.total_wards)),
        )
        .await
    }

    /// The `limit` counties with the most wards, most first. Counties with
    /// equal ward counts keep backend order.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Backend`] if any backend call fails.
    pub async fn top_counties_by_wards(
        &self,
        limit: usize,
    ) -> Result<Vec<CountyAnalytics>, AnalyticsError> {
        let mut counties = self.all_county_analytics().await?;
        counties.sort_by(|a, b| b.ward_count.cmp(&a.ward_count));
        counties.truncate(limit);
        Ok(counties)
    }

    /// Analytics for the constituency named `constituency_name`, searched
    /// across every county. The first county (in backend order) with a
    /// matching constituency wins.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if no constituency has that name
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn constituency_analytics(
        &self,
        constituency_name: &str,
    ) -> Result<ConstituencyAnalytics, AnalyticsError> {
        let counties = self.data_access.get_all_counties().await?;
        let per_county = try_join_all(
            counties
                .iter()
                .map(|c| self.data_access.get_constituencies_by_county(&c.name)),
        )
        .await?;

        let (county, constituency) = counties
            .iter()
            .zip(per_county)
            .find_map(|(county, constituencies)| {
                constituencies
                    .into_iter()
                    .find(|c| names_match(&c.name, constituency_name))
                    .map(|c| (county, c))
            })
            .ok_or_else(|| {
                AnalyticsError::not_found(RegionKind::Constituency, constituency_name)
            })?;

        let sub_counties = self
            .data_access
            .get_sub_counties_by_county(&county.name)
            .await?;

        Ok(ConstituencyAnalytics {
            constituency_name: constituency.name,
            county_name: county.name.clone(),
            ward_count: constituency.ward_count,
            sub_county_count: sub_counties.len() as u64,
            percentage_of_county_wards: stats::percentage(
                constituency.ward_count,
                county.ward_count,
            ),
        })
    }

    /// Every constituency of a county with its share of that county's
    /// wards.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if no county has that name
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn constituencies_by_county(
        &self,
        county_name: &str,
    ) -> Result<Vec<ConstituencyAnalytics>, AnalyticsError> {
        let county = self.county(county_name).await?;
        let (constituencies, sub_counties) = futures::try_join!(
            self.data_access.get_constituencies_by_county(&county.name),
            self.data_access.get_sub_counties_by_county(&county.name),
        )?;

        Ok(constituencies
            .into_iter()
            .map(|c| ConstituencyAnalytics {
                percentage_of_county_wards: stats::percentage(c.ward_count, county.ward_count),
                constituency_name: c.name,
                county_name: county.name.clone(),
                ward_count: c.ward_count,
                sub_county_count: sub_counties.len() as u64,
            })
            .collect())
    }

    /// Shape measurements and complexity class for one ward.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if no ward has that name
    /// * [`AnalyticsError::EmptyGeometry`] if the ward has no vertices
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn boundary_analytics(
        &self,
        ward_name: &str,
    ) -> Result<BoundaryAnalytics, AnalyticsError> {
        let ward = self
            .data_access
            .find_ward_by_name(ward_name)
            .await?
            .ok_or_else(|| AnalyticsError::not_found(RegionKind::Ward, ward_name))?;

        boundary_record(&ward)
    }

    /// Every ward with at least `threshold` vertices, grouped by county in
    /// backend order. Wards without a geometry are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Backend`] if a backend call fails.
    pub async fn complex_boundaries(
        &self,
        threshold: usize,
    ) -> Result<Vec<BoundaryAnalytics>, AnalyticsError> {
        let counties = self.data_access.get_all_counties().await?;
        let wards = self.wards_of(&counties).await?;

        wards
            .iter()
            .flatten()
            .filter(|w| has_geometry(w))
            .filter(|w| kenya_geo_spatial::vertex_count(&w.geometry) >= threshold)
            .map(boundary_record)
            .collect()
    }

    /// Both counties' analytics and their ward difference.
    ///
    /// `percentage_difference` is relative to `county2` and truncated toward
    /// zero; it is `0` when `county2` has no wards.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] naming the first county that
    ///   does not exist
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn compare_counties(
        &self,
        county1: &str,
        county2: &str,
    ) -> Result<CountyComparison, AnalyticsError> {
        let county1 = self.county_analytics(county1).await?;
        let county2 = self.county_analytics(county2).await?;

        let ward_difference = stats::signed_difference(county1.ward_count, county2.ward_count);

        Ok(CountyComparison {
            difference: WardDifference {
                ward_difference,
                percentage_difference: stats::truncated_percentage_difference(
                    ward_difference,
                    county2.ward_count,
                ),
            },
            county1,
            county2,
        })
    }

    /// Counties whose ward count lies in `[min_wards, max_wards]`, in
    /// backend order.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Backend`] if the backend call fails.
    pub async fn find_wards_in_range(
        &self,
        min_wards: u64,
        max_wards: u64,
    ) -> Result<Vec<RegionWardCount>, AnalyticsError> {
        Ok(self
            .data_access
            .get_all_counties()
            .await?
            .into_iter()
            .filter(|c| (min_wards..=max_wards).contains(&c.ward_count))
            .map(|c| RegionWardCount {
                region: c.name,
                ward_count: c.ward_count,
            })
            .collect())
    }

    /// Centroid and coordinate spread of each county's wards, or only of
    /// `region` when given. Counties without any ward geometry are left
    /// out.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if `region` names no county
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn spatial_distribution(
        &self,
        region: Option<&str>,
    ) -> Result<Vec<SpatialDistribution>, AnalyticsError> {
        Ok(self
            .region_geometries(region)
            .await?
            .into_iter()
            .filter_map(|r| {
                let center = kenya_geo_spatial::centroid(&r.geometry).ok()?;
                Some(SpatialDistribution {
                    coordinates: RegionCenter {
                        center_lat: center.latitude,
                        center_lng: center.longitude,
                    },
                    spread: RegionSpread {
                        lat_range: r.bounding_box.lat_range(),
                        lng_range: r.bounding_box.lng_range(),
                    },
                    region: r.name,
                    ward_count: r.ward_count,
                })
            })
            .collect())
    }

    /// Wards per 1,000 km² for each county, or only for `region` when given.
    /// Counties without any ward geometry are left out.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if `region` names no county
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn density_analysis(
        &self,
        region: Option<&str>,
    ) -> Result<Vec<DensityAnalytics>, AnalyticsError> {
        Ok(self
            .region_geometries(region)
            .await?
            .into_iter()
            .map(|r| {
                let area_sq_km = kenya_geo_spatial::area_sq_km(&r.geometry);
                DensityAnalytics {
                    ward_density: stats::density_per_1000_sq_km(r.ward_count, area_sq_km),
                    region: r.name,
                    area_sq_km,
                    ward_count: r.ward_count,
                }
            })
            .collect())
    }

    /// Dispersion of ward counts across counties.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Backend`] if the backend call fails.
    #[allow(clippy::cast_precision_loss)]
    pub async fn variance_analysis(&self) -> Result<VarianceAnalysis, AnalyticsError> {
        let counts: Vec<u64> = self
            .data_access
            .get_all_counties()
            .await?
            .iter()
            .map(|c| c.ward_count)
            .collect();

        let mean = stats::mean(&counts);
        let variance = stats::population_variance(&counts);
        let std_dev = variance.sqrt();
        let variation = stats::ratio(std_dev, mean);

        let largest = counts.iter().copied().max().unwrap_or(0);
        let smallest = counts.iter().copied().min().unwrap_or(0);

        Ok(VarianceAnalysis {
            mean,
            variance,
            std_dev,
            coefficient_of_variation: variation * 100.0,
            high_variation: variation > HIGH_VARIATION,
            significant_disparity: stats::ratio(largest as f64, smallest as f64)
                > DISPARITY_RATIO,
        })
    }

    /// Snapshot of metrics, the county breakdown, the top counties and the
    /// spatial and density analyses over every county.
    ///
    /// # Errors
    ///
    /// Returns the first error any of the composed analyses hits.
    pub async fn generate_report(&self) -> Result<AnalyticsReport, AnalyticsError> {
        let (metrics, county_breakdown, top_counties_by_wards, spatial_distribution, density) =
            futures::try_join!(
                self.metrics(),
                self.all_county_analytics(),
                self.top_counties_by_wards(DEFAULT_TOP_LIMIT),
                self.spatial_distribution(None),
                self.density_analysis(None),
            )?;

        log::info!(
            "Generated report over {} wards in {} counties",
            metrics.total_wards,
            metrics.total_counties
        );

        Ok(AnalyticsReport {
            generated_at: Utc::now(),
            metrics,
            county_breakdown,
            top_counties_by_wards,
            spatial_distribution,
            density_analysis: density,
        })
    }

    async fn county(&self, county_name: &str) -> Result<County, AnalyticsError> {
        self.data_access
            .get_county_by_name(county_name)
            .await?
            .ok_or_else(|| AnalyticsError::not_found(RegionKind::County, county_name))
    }

    #[allow(clippy::cast_precision_loss)]
    async fn county_record(
        &self,
        county: &County,
        total_wards: u64,
    ) -> Result<CountyAnalytics, AnalyticsError> {
        let (constituencies, sub_counties, wards) = futures::try_join!(
            self.data_access.get_constituencies_by_county(&county.name),
            self.data_access.get_sub_counties_by_county(&county.name),
            self.data_access.find_wards_by_county(&county.name),
        )?;

        let measured: Vec<&Ward> = wards.iter().filter(|w| has_geometry(w)).collect();
        let average_ward_area_sq_km = (!measured.is_empty()).then(|| {
            let total: f64 = measured
                .iter()
                .map(|w| kenya_geo_spatial::area_sq_km(&w.geometry))
                .sum();
            stats::ratio(total, measured.len() as f64)
        });

        Ok(CountyAnalytics {
            county_name: county.name.clone(),
            ward_count: county.ward_count,
            constituency_count: constituencies.len() as u64,
            sub_county_count: sub_counties.len() as u64,
            percentage_of_total_wards: stats::percentage(county.ward_count, total_wards),
            average_ward_area_sq_km,
            bounding_box: extent(measured.iter().map(|w| &w.geometry)),
        })
    }

    async fn wards_of(&self, counties: &[County]) -> Result<Vec<Vec<Ward>>, AnalyticsError> {
        Ok(try_join_all(
            counties
                .iter()
                .map(|c| self.data_access.find_wards_by_county(&c.name)),
        )
        .await?)
    }

    async fn region_geometries(
        &self,
        region: Option<&str>,
    ) -> Result<Vec<RegionGeometry>, AnalyticsError> {
        let counties = match region {
            Some(name) => vec![self.county(name).await?],
            None => self.data_access.get_all_counties().await?,
        };
        let wards = self.wards_of(&counties).await?;

        Ok(counties
            .into_iter()
            .zip(wards)
            .filter_map(|(county, wards)| {
                let measured: Vec<&Geometry> = wards
                    .iter()
                    .filter(|w| has_geometry(w))
                    .map(|w| &w.geometry)
                    .collect();

                let Some(bounding_box) = extent(measured.iter().copied()) else {
                    log::debug!("County {} has no ward geometry; skipping", county.name);
                    return None;
                };

                Some(RegionGeometry {
                    ward_count: wards.len() as u64,
                    geometry: kenya_geo_spatial::merge(measured),
                    bounding_box,
                    name: county.name,
                })
            })
            .collect())
    }
}

/// True when the ward has at least one vertex. Evaluated once per ward by
/// every aggregate, so a skipped ward is only logged at debug level.
fn has_geometry(ward: &Ward) -> bool {
    let present = kenya_geo_spatial::vertex_count(&ward.geometry) > 0;
    if !present {
        log::debug!("Ward {} ({}) has an empty geometry", ward.name, ward.id);
    }
    present
}

fn extent<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Option<BoundingBox> {
    geometries
        .into_iter()
        .filter_map(|g| kenya_geo_spatial::bounding_box(g).ok())
        .reduce(|a, b| a.union(&b))
}

fn boundary_record(ward: &Ward) -> Result<BoundaryAnalytics, AnalyticsError> {
    let bounding_box = kenya_geo_spatial::bounding_box(&ward.geometry).map_err(|_| {
        AnalyticsError::EmptyGeometry {
            ward: ward.name.clone(),
        }
    })?;
    let vertex_count = kenya_geo_spatial::vertex_count(&ward.geometry);

    Ok(BoundaryAnalytics {
        ward_name: ward.name.clone(),
        county_name: ward.county_name.clone(),
        constituency_name: ward.constituency_name.clone(),
        bounding_box,
        vertex_count,
        area_sq_km: kenya_geo_spatial::area_sq_km(&ward.geometry),
        perimeter_km: kenya_geo_spatial::perimeter_km(&ward.geometry),
        complexity: Complexity::from_vertex_count(vertex_count),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use kenya_geo_boundaries_models::Dataset;
    use kenya_geo_data_access::DataAccessError;

    use super::*;
    use crate::test_utils::{
        AdjustableTotal, SAMPLE_COUNTIES, Unavailable, engine, spatial, tabular,
    };

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn names(counties: &[CountyAnalytics]) -> Vec<&str> {
        counties.iter().map(|c| c.county_name.as_str()).collect()
    }

    #[tokio::test]
    async fn metrics_over_sample_counties() {
        let metrics = engine(tabular(SAMPLE_COUNTIES)).metrics().await.unwrap();

        assert_eq!(metrics.total_wards, 251);
        assert_eq!(metrics.total_counties, 5);
        assert_eq!(metrics.total_constituencies, 10);
        assert_eq!(metrics.total_sub_counties, 10);
        // 251 / 5 = 50.2, 251 / 10 = 25.1
        assert_eq!(metrics.average_wards_per_county, 50);
        assert_eq!(metrics.average_wards_per_constituency, 25);

        let largest = metrics.largest_county.unwrap();
        assert_eq!((largest.name.as_str(), largest.ward_count), ("Nairobi", 85));
        let smallest = metrics.smallest_county.unwrap();
        assert_eq!((smallest.name.as_str(), smallest.ward_count), ("Kisumu", 19));
    }

    #[tokio::test]
    async fn metrics_against_a_national_total() {
        let backend = AdjustableTotal::new(tabular(&[("Nairobi", 85), ("Mombasa", 42)]), 1_000);
        let analytics = Analytics::new(Arc::new(backend));

        let metrics = analytics.metrics().await.unwrap();
        assert_eq!(metrics.total_wards, 1_000);
        assert_eq!(metrics.largest_county.unwrap().name, "Nairobi");
        assert_eq!(metrics.smallest_county.unwrap().name, "Mombasa");

        let comparison = analytics
            .compare_counties("Nairobi", "Mombasa")
            .await
            .unwrap();
        assert_eq!(comparison.difference.ward_difference, 43);
        assert!(close(comparison.county1.percentage_of_total_wards, 8.5));
        assert!(close(comparison.county2.percentage_of_total_wards, 4.2));
    }

    #[tokio::test]
    async fn metrics_ties_pick_first_largest_and_last_smallest() {
        let metrics = engine(tabular(&[("A", 10), ("B", 10), ("C", 5), ("D", 5)]))
            .metrics()
            .await
            .unwrap();

        assert_eq!(metrics.largest_county.unwrap().name, "A");
        assert_eq!(metrics.smallest_county.unwrap().name, "D");
    }

    #[tokio::test]
    async fn metrics_on_empty_dataset_are_guarded() {
        let metrics = engine(Dataset::default()).metrics().await.unwrap();

        assert_eq!(metrics.total_wards, 0);
        assert_eq!(metrics.average_wards_per_county, 0);
        assert_eq!(metrics.average_wards_per_constituency, 0);
        assert!(metrics.largest_county.is_none());
        assert!(metrics.smallest_county.is_none());
    }

    #[tokio::test]
    async fn county_analytics_share_of_total() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));
        let nairobi = analytics.county_analytics("nairobi").await.unwrap();

        assert_eq!(nairobi.county_name, "Nairobi");
        assert_eq!(nairobi.ward_count, 85);
        assert_eq!(nairobi.constituency_count, 2);
        assert_eq!(nairobi.sub_county_count, 2);
        assert!(close(nairobi.percentage_of_total_wards, 85.0 / 251.0 * 100.0));
        assert!(nairobi.average_ward_area_sq_km.is_none());
        assert!(nairobi.bounding_box.is_none());
    }

    #[tokio::test]
    async fn county_analytics_uses_current_total() {
        let backend = Arc::new(AdjustableTotal::new(tabular(&[("Nairobi", 85)]), 1_000));
        let analytics = Analytics::new(backend.clone());

        let before = analytics.county_analytics("Nairobi").await.unwrap();
        assert!(close(before.percentage_of_total_wards, 8.5));

        backend.total_wards.store(500, Ordering::SeqCst);
        let after = analytics.county_analytics("Nairobi").await.unwrap();
        assert!(close(after.percentage_of_total_wards, 17.0));
    }

    #[tokio::test]
    async fn county_analytics_guards_zero_total() {
        let county = engine(tabular(&[("Lamu", 0)]))
            .county_analytics("Lamu")
            .await
            .unwrap();
        assert!(close(county.percentage_of_total_wards, 0.0));
    }

    #[tokio::test]
    async fn county_analytics_missing_county() {
        let err = engine(tabular(SAMPLE_COUNTIES))
            .county_analytics("Atlantis")
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            AnalyticsError::RegionNotFound { kind: RegionKind::County, name } if name == "Atlantis"
        ));
        assert_eq!(err.to_string(), "county not found: Atlantis");
    }

    #[tokio::test]
    async fn all_county_analytics_keeps_backend_order() {
        let all = engine(tabular(SAMPLE_COUNTIES))
            .all_county_analytics()
            .await
            .unwrap();

        assert_eq!(
            names(&all),
            vec!["Nairobi", "Kiambu", "Nakuru", "Mombasa", "Kisumu"]
        );
        let total: f64 = all.iter().map(|c| c.percentage_of_total_wards).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn top_counties_sorted_and_limited() {
        let analytics = engine(tabular(&[
            ("Kisumu", 19),
            ("Nairobi", 85),
            ("Mombasa", 42),
            ("Kiambu", 58),
            ("Nakuru", 47),
        ]));

        let top = analytics.top_counties_by_wards(3).await.unwrap();
        assert_eq!(names(&top), vec!["Nairobi", "Kiambu", "Nakuru"]);

        let all = analytics
            .top_counties_by_wards(DEFAULT_TOP_LIMIT)
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].ward_count >= w[1].ward_count));

        assert!(analytics.top_counties_by_wards(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn constituencies_share_county_wards() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));
        let constituencies = analytics.constituencies_by_county("Nairobi").await.unwrap();

        assert_eq!(constituencies.len(), 2);
        assert_eq!(constituencies[0].constituency_name, "Nairobi North");
        assert_eq!(constituencies[0].ward_count, 42);
        assert_eq!(constituencies[1].ward_count, 43);
        assert!(close(
            constituencies[0].percentage_of_county_wards,
            42.0 / 85.0 * 100.0
        ));
        assert_eq!(constituencies[0].sub_county_count, 2);

        let total: f64 = constituencies
            .iter()
            .map(|c| c.percentage_of_county_wards)
            .sum();
        assert!((total - 100.0).abs() < 1e-9);

        assert!(matches!(
            analytics.constituencies_by_county("Atlantis").await,
            Err(AnalyticsError::RegionNotFound {
                kind: RegionKind::County,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn constituency_lookup_across_counties() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));
        let constituency = analytics
            .constituency_analytics("mombasa south")
            .await
            .unwrap();

        assert_eq!(constituency.constituency_name, "Mombasa South");
        assert_eq!(constituency.county_name, "Mombasa");
        assert_eq!(constituency.ward_count, 21);
        assert_eq!(constituency.sub_county_count, 2);
        assert!(close(constituency.percentage_of_county_wards, 50.0));

        assert!(matches!(
            analytics.constituency_analytics("Gotham").await,
            Err(AnalyticsError::RegionNotFound {
                kind: RegionKind::Constituency,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn compare_counties_is_antisymmetric() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));

        let forward = analytics
            .compare_counties("Nairobi", "Mombasa")
            .await
            .unwrap();
        assert_eq!(forward.county1.county_name, "Nairobi");
        assert_eq!(forward.difference.ward_difference, 43);
        // 43 / 42 * 100 = 102.38
        assert_eq!(forward.difference.percentage_difference, 102);

        let backward = analytics
            .compare_counties("Mombasa", "Nairobi")
            .await
            .unwrap();
        assert_eq!(
            backward.difference.ward_difference,
            -forward.difference.ward_difference
        );
        // -43 / 85 * 100 = -50.58
        assert_eq!(backward.difference.percentage_difference, -50);
    }

    #[tokio::test]
    async fn compare_against_zero_ward_county() {
        let comparison = engine(tabular(&[("Nairobi", 85), ("Empty", 0)]))
            .compare_counties("Nairobi", "Empty")
            .await
            .unwrap();

        assert_eq!(comparison.difference.ward_difference, 85);
        assert_eq!(comparison.difference.percentage_difference, 0);
    }

    #[tokio::test]
    async fn compare_fails_on_first_missing_county() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));

        let err = analytics
            .compare_counties("Atlantis", "Narnia")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::RegionNotFound { name, .. } if name == "Atlantis"));

        let err = analytics
            .compare_counties("Nairobi", "Narnia")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::RegionNotFound { name, .. } if name == "Narnia"));
    }

    #[tokio::test]
    async fn range_is_inclusive_and_stable() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));

        let medium = analytics.find_wards_in_range(20, 49).await.unwrap();
        let counts: Vec<u64> = medium.iter().map(|r| r.ward_count).collect();
        assert_eq!(counts, vec![47, 42]);

        let wider = analytics.find_wards_in_range(20, 58).await.unwrap();
        let counts: Vec<u64> = wider.iter().map(|r| r.ward_count).collect();
        assert_eq!(counts, vec![58, 47, 42]);
        assert_eq!(wider[0].region, "Kiambu");

        assert_eq!(analytics.find_wards_in_range(20, 58).await.unwrap(), wider);
        assert!(analytics.find_wards_in_range(60, 80).await.unwrap().is_empty());
        assert!(analytics.find_wards_in_range(50, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn boundary_analytics_measures_geometry() {
        let boundary = engine(spatial())
            .boundary_analytics("KILIMANI")
            .await
            .unwrap();

        assert_eq!(boundary.ward_name, "Kilimani");
        assert_eq!(boundary.county_name, "Nairobi");
        assert_eq!(boundary.constituency_name, "Dagoretti North");
        assert_eq!(boundary.vertex_count, 5);
        assert_eq!(boundary.complexity, Complexity::Simple);

        let bbox = boundary.bounding_box;
        assert!((bbox.min_lat - -1.3).abs() < 1e-9);
        assert!((bbox.max_lat - -1.2).abs() < 1e-9);
        assert!((bbox.min_lng - 36.7).abs() < 1e-9);
        assert!((bbox.max_lng - 36.8).abs() < 1e-9);

        // A 0.1 degree square near the equator is ~11.1 km a side.
        assert!(boundary.area_sq_km > 120.0 && boundary.area_sq_km < 127.0);
        assert!(boundary.perimeter_km > 44.0 && boundary.perimeter_km < 45.0);
    }

    #[tokio::test]
    async fn boundary_analytics_complexity_classes() {
        let analytics = engine(spatial());

        // Outer ring plus three holes, 5 positions each.
        let holes = analytics.boundary_analytics("Kileleshwa").await.unwrap();
        assert_eq!(holes.vertex_count, 20);
        assert_eq!(holes.complexity, Complexity::Simple);

        let sixty = analytics.boundary_analytics("Parklands").await.unwrap();
        assert_eq!(sixty.vertex_count, 60);
        assert_eq!(sixty.complexity, Complexity::Moderate);

        let complex = analytics.boundary_analytics("Karura").await.unwrap();
        assert_eq!(complex.vertex_count, 250);
        assert_eq!(complex.complexity, Complexity::Complex);
    }

    #[tokio::test]
    async fn boundary_analytics_errors() {
        let analytics = engine(spatial());

        assert!(matches!(
            analytics.boundary_analytics("Ghost").await,
            Err(AnalyticsError::EmptyGeometry { ward }) if ward == "Ghost"
        ));
        assert!(matches!(
            analytics.boundary_analytics("Nowhere").await,
            Err(AnalyticsError::RegionNotFound {
                kind: RegionKind::Ward,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn complex_boundaries_by_threshold() {
        let analytics = engine(spatial());

        let complex = analytics
            .complex_boundaries(DEFAULT_COMPLEXITY_THRESHOLD)
            .await
            .unwrap();
        let names: Vec<&str> = complex.iter().map(|b| b.ward_name.as_str()).collect();
        assert_eq!(names, vec!["Karura"]);

        let moderate = analytics.complex_boundaries(50).await.unwrap();
        let classes: Vec<(&str, Complexity)> = moderate
            .iter()
            .map(|b| (b.ward_name.as_str(), b.complexity))
            .collect();
        assert_eq!(
            classes,
            vec![
                ("Parklands", Complexity::Moderate),
                ("Karura", Complexity::Complex)
            ]
        );

        // The empty ward is skipped rather than failing the whole query.
        assert_eq!(analytics.complex_boundaries(0).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn county_analytics_with_geometry() {
        let analytics = engine(spatial());
        let mombasa = analytics.county_analytics("Mombasa").await.unwrap();

        assert_eq!(mombasa.ward_count, 2);
        let bbox = mombasa.bounding_box.unwrap();
        assert!((bbox.lat_range() - 0.2).abs() < 1e-9);
        // Only Nyali has a geometry: a 0.2 degree square at 4 degrees south.
        let area = mombasa.average_ward_area_sq_km.unwrap();
        assert!(area > 480.0 && area < 510.0, "{area}");
    }

    #[tokio::test]
    async fn spatial_distribution_per_county() {
        let analytics = engine(spatial());
        let distribution = analytics.spatial_distribution(None).await.unwrap();

        let regions: Vec<&str> = distribution.iter().map(|d| d.region.as_str()).collect();
        assert_eq!(regions, vec!["Nairobi", "Mombasa"]);

        let mombasa = &distribution[1];
        assert_eq!(mombasa.ward_count, 2);
        assert!((mombasa.coordinates.center_lat - -4.0).abs() < 1e-6);
        assert!((mombasa.coordinates.center_lng - 39.8).abs() < 1e-6);
        assert!((mombasa.spread.lat_range - 0.2).abs() < 1e-9);
        assert!((mombasa.spread.lng_range - 0.2).abs() < 1e-9);

        let nairobi = &distribution[0];
        assert_eq!(nairobi.ward_count, 4);
        assert!(nairobi.spread.lng_range > 0.25);

        let only = analytics
            .spatial_distribution(Some("mombasa"))
            .await
            .unwrap();
        assert_eq!(only, vec![mombasa.clone()]);
    }

    #[tokio::test]
    async fn density_is_computed_from_area() {
        let analytics = engine(spatial());
        let density = analytics.density_analysis(Some("Mombasa")).await.unwrap();

        assert_eq!(density.len(), 1);
        let mombasa = &density[0];
        assert!(mombasa.area_sq_km > 480.0 && mombasa.area_sq_km < 510.0);
        assert!(close(
            mombasa.ward_density,
            2.0 / mombasa.area_sq_km * 1_000.0
        ));

        assert!(matches!(
            analytics.density_analysis(Some("Atlantis")).await,
            Err(AnalyticsError::RegionNotFound {
                kind: RegionKind::County,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn spatial_analyses_skip_counties_without_geometry() {
        let analytics = engine(tabular(SAMPLE_COUNTIES));
        assert!(analytics.spatial_distribution(None).await.unwrap().is_empty());
        assert!(analytics.density_analysis(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn variance_over_sample_counties() {
        let variance = engine(tabular(SAMPLE_COUNTIES))
            .variance_analysis()
            .await
            .unwrap();

        assert!(close(variance.mean, 50.2));
        assert!(close(variance.variance, 464.56));
        assert!(close(variance.std_dev, 464.56_f64.sqrt()));
        assert!(close(
            variance.coefficient_of_variation,
            464.56_f64.sqrt() / 50.2 * 100.0
        ));
        assert!(!variance.high_variation);
        // 85 / 19 = 4.47
        assert!(!variance.significant_disparity);
    }

    #[tokio::test]
    async fn variance_flags_and_guards() {
        let skewed = engine(tabular(&[("A", 100), ("B", 10)]))
            .variance_analysis()
            .await
            .unwrap();
        assert!(skewed.high_variation);
        assert!(skewed.significant_disparity);

        let zero = engine(tabular(&[("A", 0), ("B", 0)]))
            .variance_analysis()
            .await
            .unwrap();
        assert!(close(zero.coefficient_of_variation, 0.0));
        assert!(!zero.high_variation);
        assert!(!zero.significant_disparity);
    }

    #[tokio::test]
    async fn report_composes_every_analysis() {
        let report = engine(spatial()).generate_report().await.unwrap();

        assert_eq!(report.metrics.total_wards, 6);
        assert_eq!(report.county_breakdown.len(), 2);
        assert_eq!(names(&report.top_counties_by_wards), vec!["Nairobi", "Mombasa"]);
        assert_eq!(report.spatial_distribution.len(), 2);
        assert_eq!(report.density_analysis.len(), 2);
    }

    #[tokio::test]
    async fn backend_failures_propagate_unchanged() {
        let analytics = Analytics::new(Arc::new(Unavailable));

        assert!(matches!(
            analytics.metrics().await,
            Err(AnalyticsError::Backend(DataAccessError::Backend { .. }))
        ));
        assert!(matches!(
            analytics.county_analytics("Nairobi").await,
            Err(AnalyticsError::Backend(_))
        ));
        assert!(matches!(
            analytics.generate_report().await,
            Err(AnalyticsError::Backend(_))
        ));
    }
}
