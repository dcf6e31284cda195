pub mod activity_totals;
pub mod common;
pub mod report;
