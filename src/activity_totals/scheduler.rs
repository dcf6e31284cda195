use super::aggregate::YearAggregator;
use crate::common::types::{
    CommuteError, CommuteResult, ResultTable, STRAVA_EPOCH_YEAR, YearDistance,
};
use chrono::{Datelike, Utc};
use function_timer::time;
use futures::FutureExt;
use futures::future::try_join_all;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Orders the requested years and clamps them to what the provider can hold.
pub fn normalize_years(start: i32, end: i32, current_year: i32) -> RangeInclusive<i32> {
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    start.max(STRAVA_EPOCH_YEAR)..=end.min(current_year)
}

/// Runs one aggregation task per year and collects the results.
pub struct MultiYearScheduler {
    aggregator: YearAggregator,
}

impl MultiYearScheduler {
    pub fn new(aggregator: YearAggregator) -> Self {
        Self { aggregator }
    }

    pub async fn run(&self, start: i32, end: i32) -> CommuteResult<ResultTable> {
        let years = normalize_years(start, end, Utc::now().year());
        self.run_years(years).await
    }

    #[time("multi_year_run_duration")]
    pub async fn run_years(&self, years: RangeInclusive<i32>) -> CommuteResult<ResultTable> {
        if years.is_empty() {
            return Err(CommuteError::InvalidInput(format!(
                "no years between {} and {} can hold activities",
                years.start(),
                years.end()
            )));
        }
        info!("Aggregating years {} to {}", years.start(), years.end());

        let results = Arc::new(Mutex::new(ResultTable::new()));

        // First failure ends the run; the other tasks are detached, not cancelled
        let tasks = years.map(|year| {
            let aggregator = self.aggregator.clone();
            let results = Arc::clone(&results);

            tokio::spawn(async move {
                let distance = aggregator.aggregate(year).await?;
                store(&results, distance)
            })
            .map(move |joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(CommuteError::TaskFailed(format!("year {year}: {e}"))),
            })
        });
        try_join_all(tasks).await?;

        let table = match Arc::try_unwrap(results) {
            Ok(mutex) => mutex.into_inner().map_err(|_| poisoned())?,
            Err(shared) => {
                let table = shared.lock().map_err(|_| poisoned())?.clone();
                table
            }
        };

        info!("Aggregated {} years", table.len());
        Ok(table)
    }
}

fn store(results: &Mutex<ResultTable>, distance: YearDistance) -> CommuteResult<()> {
    let mut table = results.lock().map_err(|_| poisoned())?;
    table.insert(distance.year, distance);
    Ok(())
}

fn poisoned() -> CommuteError {
    CommuteError::TaskFailed("result table lock poisoned".to_string())
}
