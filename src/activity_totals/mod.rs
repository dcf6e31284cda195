mod aggregate;
mod bounds;
mod scheduler;

pub use aggregate::{YearAggregator, summarize};
pub use bounds::year_bounds;
pub use scheduler::{MultiYearScheduler, normalize_years};
