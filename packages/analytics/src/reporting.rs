//! Text, CSV and JSON renderings of analytics results.
//!
//! Formatters only read the records they are given.

use kenya_geo_analytics_models::{
    AnalyticsMetrics, AnalyticsReport, ConstituencyAnalytics, CountyAnalytics, CountyComparison,
    CountySize, VarianceAnalysis,
};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::AnalyticsError;

/// Counties listed in each half of [`distribution_summary`].
const DISTRIBUTION_SAMPLE: usize = 5;

/// Output format for a full report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Renders `report` in `format`. CSV covers the county breakdown only.
///
/// # Errors
///
/// Returns [`AnalyticsError::Json`] or [`AnalyticsError::Export`] if
/// serialization fails.
pub fn render(report: &AnalyticsReport, format: ReportFormat) -> Result<String, AnalyticsError> {
    match format {
        ReportFormat::Text => Ok(text_report(report)),
        ReportFormat::Json => to_json(report),
        ReportFormat::Csv => county_csv(&report.county_breakdown),
    }
}

#[must_use]
pub fn format_metrics(metrics: &AnalyticsMetrics) -> String {
    [
        "=== KENYA GEOSPATIAL DATA METRICS ===".to_string(),
        String::new(),
        "Total Administrative Divisions:".to_string(),
        format!("  • Wards: {}", metrics.total_wards),
        format!("  • Counties: {}", metrics.total_counties),
        format!("  • Constituencies: {}", metrics.total_constituencies),
        format!("  • Sub-counties: {}", metrics.total_sub_counties),
        String::new(),
        "Averages:".to_string(),
        format!("  • Wards per County: {}", metrics.average_wards_per_county),
        format!(
            "  • Wards per Constituency: {}",
            metrics.average_wards_per_constituency
        ),
        String::new(),
        "Extremes:".to_string(),
        format!(
            "  • Largest County: {}",
            county_size(metrics.largest_county.as_ref())
        ),
        format!(
            "  • Smallest County: {}",
            county_size(metrics.smallest_county.as_ref())
        ),
    ]
    .join("\n")
}

fn county_size(size: Option<&CountySize>) -> String {
    size.map_or_else(
        || "N/A".to_string(),
        |s| format!("{} ({} wards)", s.name, s.ward_count),
    )
}

/// Fixed-width table of county name, wards, constituencies and share.
#[must_use]
pub fn format_county_table(counties: &[CountyAnalytics]) -> String {
    let mut lines = vec![
        format!(
            "{:<25}{:<10}{:<15}% of Total",
            "County", "Wards", "Constituencies"
        ),
        "=".repeat(70),
    ];

    lines.extend(counties.iter().map(|c| {
        format!(
            "{:<25}{:<10}{:<15}{:.2}%",
            c.county_name, c.ward_count, c.constituency_count, c.percentage_of_total_wards
        )
    }));

    lines.join("\n")
}

#[derive(Serialize)]
struct CountyRow<'a> {
    #[serde(rename = "County")]
    county: &'a str,
    #[serde(rename = "Wards")]
    wards: u64,
    #[serde(rename = "Constituencies")]
    constituencies: u64,
    #[serde(rename = "Sub-counties")]
    sub_counties: u64,
    #[serde(rename = "Percentage of Total")]
    percentage: String,
}

/// County breakdown as CSV with a header row.
///
/// # Errors
///
/// Returns [`AnalyticsError::Export`] if a row cannot be written.
pub fn county_csv(counties: &[CountyAnalytics]) -> Result<String, AnalyticsError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    if counties.is_empty() {
        writer
            .write_record([
                "County",
                "Wards",
                "Constituencies",
                "Sub-counties",
                "Percentage of Total",
            ])
            .map_err(export_error)?;
    }

    for c in counties {
        writer
            .serialize(CountyRow {
                county: &c.county_name,
                wards: c.ward_count,
                constituencies: c.constituency_count,
                sub_counties: c.sub_county_count,
                percentage: format!("{:.2}", c.percentage_of_total_wards),
            })
            .map_err(export_error)?;
    }

    let bytes = writer.into_inner().map_err(export_error)?;
    String::from_utf8(bytes).map_err(export_error)
}

fn export_error(e: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::Export {
        message: e.to_string(),
    }
}

/// Pretty-printed JSON.
///
/// # Errors
///
/// Returns [`AnalyticsError::Json`] if `value` cannot be serialized.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AnalyticsError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Metrics, top counties and a generation footer.
#[must_use]
pub fn text_report(report: &AnalyticsReport) -> String {
    [
        format_metrics(&report.metrics),
        String::new(),
        "=== TOP COUNTIES BY WARD COUNT ===".to_string(),
        String::new(),
        format_county_table(&report.top_counties_by_wards),
        String::new(),
        "=== SUMMARY STATISTICS ===".to_string(),
        String::new(),
        format!("Total Wards Analyzed: {}", report.metrics.total_wards),
        format!("Report Generated: {}", report.generated_at.to_rfc3339()),
    ]
    .join("\n")
}

#[must_use]
pub fn comparison_report(comparison: &CountyComparison) -> String {
    let county = |c: &CountyAnalytics| {
        [
            format!("{}:", c.county_name),
            format!("  • Wards: {}", c.ward_count),
            format!("  • Constituencies: {}", c.constituency_count),
            format!(
                "  • Percentage of Total: {:.2}%",
                c.percentage_of_total_wards
            ),
        ]
        .join("\n")
    };

    [
        "=== COUNTY COMPARISON ===".to_string(),
        String::new(),
        county(&comparison.county1),
        String::new(),
        county(&comparison.county2),
        String::new(),
        "Difference:".to_string(),
        format!(
            "  • Ward Difference: {}",
            signed(comparison.difference.ward_difference)
        ),
        format!(
            "  • Percentage Difference: {}%",
            signed(comparison.difference.percentage_difference)
        ),
    ]
    .join("\n")
}

/// Positive values get a leading `+`; zero and negatives print as-is.
fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// The five counties with the most wards and the five with the fewest
/// (smallest first).
#[must_use]
pub fn distribution_summary(counties: &[CountyAnalytics]) -> String {
    let mut sorted: Vec<&CountyAnalytics> = counties.iter().collect();
    sorted.sort_by(|a, b| b.ward_count.cmp(&a.ward_count));

    let top = &sorted[..sorted.len().min(DISTRIBUTION_SAMPLE)];
    let mut bottom = sorted[sorted.len().saturating_sub(DISTRIBUTION_SAMPLE)..].to_vec();
    bottom.reverse();

    let mut lines = vec![format!("=== TOP {DISTRIBUTION_SAMPLE} COUNTIES ===")];
    lines.extend(ranked(top));
    lines.push(String::new());
    lines.push(format!("=== BOTTOM {DISTRIBUTION_SAMPLE} COUNTIES ==="));
    lines.extend(ranked(&bottom));

    lines.join("\n")
}

fn ranked(counties: &[&CountyAnalytics]) -> Vec<String> {
    counties
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}: {} wards", i + 1, c.county_name, c.ward_count))
        .collect()
}

/// One county's headline figures followed by its constituencies.
#[must_use]
pub fn county_quick_stats(
    county: &CountyAnalytics,
    constituencies: &[ConstituencyAnalytics],
) -> String {
    let mut lines = vec![
        format!("=== {} ===", county.county_name.to_uppercase()),
        String::new(),
        format!("Wards: {}", county.ward_count),
        format!("Constituencies: {}", county.constituency_count),
        format!("Sub-counties: {}", county.sub_county_count),
        format!(
            "Percentage of Total Wards: {:.2}%",
            county.percentage_of_total_wards
        ),
    ];

    if let Some(area) = county.average_ward_area_sq_km {
        lines.push(format!("Average Ward Area: {area:.2} km²"));
    }

    lines.push(String::new());
    lines.push("Constituencies:".to_string());
    lines.extend(
        constituencies
            .iter()
            .map(|c| format!("  • {}: {} wards", c.constituency_name, c.ward_count)),
    );

    lines.join("\n")
}

#[must_use]
pub fn format_variance(variance: &VarianceAnalysis) -> String {
    [
        "=== VARIANCE ANALYSIS ===".to_string(),
        String::new(),
        format!("Mean Wards per County: {:.2}", variance.mean),
        format!("Standard Deviation: {:.2}", variance.std_dev),
        format!(
            "Coefficient of Variation: {:.2}%",
            variance.coefficient_of_variation
        ),
        String::new(),
        "Interpretation:".to_string(),
        if variance.high_variation {
            "  • High variation in ward distribution across counties"
        } else {
            "  • Relatively uniform ward distribution"
        }
        .to_string(),
        if variance.significant_disparity {
            "  • Significant disparity between largest and smallest counties"
        } else {
            "  • Balanced county sizes"
        }
        .to_string(),
    ]
    .join("\n")
}
