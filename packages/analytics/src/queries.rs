//! Ready-made views composed from [`Analytics`] calls.

use kenya_geo_analytics_models::{CountiesBySize, VarianceAnalysis};

use crate::{Analytics, AnalyticsError, reporting};

/// Ward-count band of a large county.
pub const LARGE_COUNTY_WARDS: (u64, u64) = (50, 1_000);

/// Ward-count band of a medium county.
pub const MEDIUM_COUNTY_WARDS: (u64, u64) = (20, 49);

/// Ward-count band of a small county.
pub const SMALL_COUNTY_WARDS: (u64, u64) = (1, 19);

/// Commonly requested analytics, rendered or grouped for direct display.
#[derive(Clone)]
pub struct AnalyticsQueries {
    analytics: Analytics,
}

impl AnalyticsQueries {
    #[must_use]
    pub const fn new(analytics: Analytics) -> Self {
        Self { analytics }
    }

    #[must_use]
    pub const fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    /// Formatted dataset metrics.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the metrics cannot be computed.
    pub async fn executive_summary(&self) -> Result<String, AnalyticsError> {
        Ok(reporting::format_metrics(&self.analytics.metrics().await?))
    }

    /// Table of the `limit` counties with the most wards.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county analytics cannot be computed.
    pub async fn top_performers(&self, limit: usize) -> Result<String, AnalyticsError> {
        let top = self.analytics.top_counties_by_wards(limit).await?;
        Ok(reporting::format_county_table(&top))
    }

    /// Top five and bottom five counties by ward count.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county analytics cannot be computed.
    pub async fn distribution_analysis(&self) -> Result<String, AnalyticsError> {
        let counties = self.analytics.all_county_analytics().await?;
        Ok(reporting::distribution_summary(&counties))
    }

    /// Counties grouped into large, medium and small by ward count. Counties
    /// with no wards, or more than 1,000, fall in no group.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county list cannot be read.
    pub async fn counties_by_size(&self) -> Result<CountiesBySize, AnalyticsError> {
        let (large, medium, small) = futures::try_join!(
            self.analytics
                .find_wards_in_range(LARGE_COUNTY_WARDS.0, LARGE_COUNTY_WARDS.1),
            self.analytics
                .find_wards_in_range(MEDIUM_COUNTY_WARDS.0, MEDIUM_COUNTY_WARDS.1),
            self.analytics
                .find_wards_in_range(SMALL_COUNTY_WARDS.0, SMALL_COUNTY_WARDS.1),
        )?;

        Ok(CountiesBySize {
            large,
            medium,
            small,
        })
    }

    /// Table of every county in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county analytics cannot be computed.
    pub async fn regional_breakdown(&self) -> Result<String, AnalyticsError> {
        let counties = self.analytics.all_county_analytics().await?;
        Ok(reporting::format_county_table(&counties))
    }

    /// A freshly generated report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the report cannot be generated or
    /// serialized.
    pub async fn export_json(&self) -> Result<String, AnalyticsError> {
        reporting::to_json(&self.analytics.generate_report().await?)
    }

    /// Every county's analytics as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county analytics cannot be computed
    /// or written.
    pub async fn export_counties_csv(&self) -> Result<String, AnalyticsError> {
        reporting::county_csv(&self.analytics.all_county_analytics().await?)
    }

    /// One county's figures and its constituencies.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::RegionNotFound`] if no county has that name
    /// * [`AnalyticsError::Backend`] if a backend call fails
    pub async fn county_quick_stats(&self, county_name: &str) -> Result<String, AnalyticsError> {
        let (county, constituencies) = futures::try_join!(
            self.analytics.county_analytics(county_name),
            self.analytics.constituencies_by_county(county_name),
        )?;

        Ok(reporting::county_quick_stats(&county, &constituencies))
    }

    /// Dispersion of ward counts across counties.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county list cannot be read.
    pub async fn variance_analysis(&self) -> Result<VarianceAnalysis, AnalyticsError> {
        self.analytics.variance_analysis().await
    }

    /// [`Self::variance_analysis`] with an interpretation, as text.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if the county list cannot be read.
    pub async fn variance_summary(&self) -> Result<String, AnalyticsError> {
        Ok(reporting::format_variance(&self.variance_analysis().await?))
    }
}
