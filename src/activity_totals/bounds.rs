use crate::common::types::{CommuteError, CommuteResult};
use chrono::{FixedOffset, TimeZone};

// Year boundaries are taken at a fixed -08:00 offset, regardless of where
// the athlete rides or daylight saving
const PROVIDER_UTC_OFFSET_SECS: i32 = -8 * 3600;

/// Epoch seconds of 00:00:01 on Jan 1 and 23:59:59 on Dec 31 of `year`.
pub fn year_bounds(year: i32) -> CommuteResult<(i64, i64)> {
    let offset = FixedOffset::east_opt(PROVIDER_UTC_OFFSET_SECS)
        .ok_or_else(|| CommuteError::InvalidInput("invalid provider offset".to_string()))?;

    let start = offset.with_ymd_and_hms(year, 1, 1, 0, 0, 1).single();
    let end = offset.with_ymd_and_hms(year, 12, 31, 23, 59, 59).single();

    match (start, end) {
        (Some(start), Some(end)) => Ok((start.timestamp(), end.timestamp())),
        _ => Err(CommuteError::InvalidInput(format!("year {year} is out of range"))),
    }
}
