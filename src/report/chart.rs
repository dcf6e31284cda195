use crate::common::types::{CommuteError, CommuteResult, ResultTable, YearDistance};
use chrono::{Datelike, NaiveDate, Utc};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

const CHART_SIZE: (u32, u32) = (500, 500);
const BAR_HALF_WIDTH: f64 = 0.35;

const COMMUTE_COLOR: RGBColor = RGBColor(0xcc, 0x00, 0x00);
const PLEASURE_COLOR: RGBColor = RGBColor(0x00, 0xcc, 0x00);

pub trait ChartRenderer {
    /// Draws the table and returns where the chart was written.
    fn render(&self, results: &ResultTable) -> CommuteResult<PathBuf>;
}

/// Stacked commute/pleasure bar chart written as SVG.
pub struct SvgBarChart {
    output_dir: PathBuf,
    date: NaiveDate,
}

impl SvgBarChart {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            date: Utc::now().date_naive(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "commute-{}-{}-{}.svg",
            self.date.year(),
            self.date.month(),
            self.date.day()
        ))
    }
}

impl ChartRenderer for SvgBarChart {
    fn render(&self, results: &ResultTable) -> CommuteResult<PathBuf> {
        let (Some(first), Some(last)) = (results.keys().next(), results.keys().next_back()) else {
            return Err(CommuteError::Chart("no years to chart".to_string()));
        };

        let path = self.output_path();
        draw_stacked_bars(&path, *first, *last, results)
            .map_err(|e| CommuteError::Chart(format!("{}: {e}", path.display())))?;

        info!("Chart written to {}", path.display());
        Ok(path)
    }
}

fn draw_stacked_bars(
    path: &Path,
    first: i32,
    last: i32,
    results: &ResultTable,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let max_total = results.values().map(YearDistance::total).fold(0.0, f64::max);
    let y_max = if max_total > 0.0 { max_total * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption("Strava Commutes and Pleasure Rides", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(f64::from(first - 1)..f64::from(last + 1), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels((last - first + 3) as usize)
        .x_label_formatter(&|x| format!("{}", x.round() as i64))
        .y_label_formatter(&|y| format!("{}", *y as i64))
        .x_desc("Year")
        .y_desc("Distance (km)")
        .draw()?;

    // Commutes sit at the bottom of each bar, pleasure is stacked on top
    chart
        .draw_series(results.values().map(|distance| {
            let x = f64::from(distance.year);
            Rectangle::new(
                [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, distance.commute)],
                COMMUTE_COLOR.filled(),
            )
        }))?
        .label("Commutes")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], COMMUTE_COLOR.filled()));

    chart
        .draw_series(results.values().map(|distance| {
            let x = f64::from(distance.year);
            Rectangle::new(
                [
                    (x - BAR_HALF_WIDTH, distance.commute),
                    (x + BAR_HALF_WIDTH, distance.total()),
                ],
                PLEASURE_COLOR.filled(),
            )
        }))?
        .label("Pleasure")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], PLEASURE_COLOR.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_output_path_uses_date() {
        let chart = SvgBarChart::new("/tmp/charts")
            .with_date(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        assert_eq!(
            chart.output_path(),
            PathBuf::from("/tmp/charts/commute-2026-3-7.svg")
        );
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let dir = TempDir::new("chart").unwrap();
        let result = SvgBarChart::new(dir.path()).render(&ResultTable::new());
        assert!(matches!(result, Err(CommuteError::Chart(_))));
    }

    #[test]
    fn test_render_writes_svg() {
        let dir = TempDir::new("chart").unwrap();
        let mut table = ResultTable::new();
        for (year, commute, pleasure) in [(2019, 1200.0, 800.0), (2020, 600.0, 1500.0)] {
            table.insert(
                year,
                YearDistance {
                    year,
                    commute,
                    pleasure,
                },
            );
        }

        let path = SvgBarChart::new(dir.path()).render(&table).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Strava Commutes and Pleasure Rides"));
    }
}
