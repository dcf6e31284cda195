pub mod chart;

pub use chart::{ChartRenderer, SvgBarChart};

use crate::activity_totals::year_bounds;
use crate::common::types::{CommuteResult, ResultTable, YearDistance};
use chrono::{DateTime, Utc};
use std::fmt;

// 25 km/day, 5 days a week, 5 weeks a year off the bike
pub const ANNUAL_COMMUTE_KM: f64 = 5875.0;

// leap years ignored
const HOURS_IN_YEAR: f64 = 24.0 * 365.0;

/// Extrapolation for a year that has not finished yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearProjection {
    pub elapsed_fraction: f64,
    pub estimated_total_km: f64,
    pub estimated_commute_target_share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearReport {
    pub year: i32,
    pub total_km: f64,
    pub commute_km: f64,
    pub pleasure_km: f64,
    pub commute_share: f64,
    pub pleasure_share: f64,
    pub commute_target_share: f64,
    pub projection: Option<YearProjection>,
}

impl YearReport {
    pub fn from_distance(distance: &YearDistance, now: DateTime<Utc>) -> CommuteResult<Self> {
        let (start, end) = year_bounds(distance.year)?;
        let total = distance.total();

        let projection = if end > now.timestamp() {
            let elapsed_hours = (now.timestamp() - start) as f64 / 3600.0;
            let elapsed_fraction = elapsed_hours / HOURS_IN_YEAR;
            (elapsed_fraction > 0.0).then(|| YearProjection {
                elapsed_fraction,
                estimated_total_km: total / elapsed_fraction,
                estimated_commute_target_share: percent(
                    distance.commute / elapsed_fraction,
                    ANNUAL_COMMUTE_KM,
                ),
            })
        } else {
            None
        };

        Ok(Self {
            year: distance.year,
            total_km: total,
            commute_km: distance.commute,
            pleasure_km: distance.pleasure,
            commute_share: percent(distance.commute, total),
            pleasure_share: percent(distance.pleasure, total),
            commute_target_share: percent(distance.commute, ANNUAL_COMMUTE_KM),
            projection,
        })
    }
}

impl fmt::Display for YearReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.year)?;
        writeln!(f, "Total Distance (km): {:.1}", self.total_km)?;
        if let Some(projection) = &self.projection {
            writeln!(
                f,
                "  Estimated end of year distance (km): {:.1}",
                projection.estimated_total_km
            )?;
        }
        writeln!(
            f,
            "Total Commute (km): {:.1}, {:.1}%",
            self.commute_km, self.commute_share
        )?;
        writeln!(
            f,
            "  Percentage of commute by bike: {:.1}%",
            self.commute_target_share
        )?;
        if let Some(projection) = &self.projection {
            writeln!(
                f,
                "  Estimated percentage of commute by bike for year: {:.1}%",
                projection.estimated_commute_target_share
            )?;
        }
        writeln!(
            f,
            "Total Pleasure (km): {:.1}, {:.1}%",
            self.pleasure_km, self.pleasure_share
        )
    }
}

/// Text report for every year in the table, oldest first.
pub fn render_text(results: &ResultTable, now: DateTime<Utc>) -> CommuteResult<String> {
    let reports = results
        .values()
        .map(|distance| YearReport::from_distance(distance, now))
        .collect::<CommuteResult<Vec<_>>>()?;

    Ok(reports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}
