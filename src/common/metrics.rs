use metrics::{counter, gauge};

/// Error/Reliability Metrics - Success/Failure pairs
pub fn increment_strava_api_success() {
    counter!("strava_api_total", "result" => "success").increment(1);
}

pub fn increment_strava_api_failure() {
    counter!("strava_api_total", "result" => "failure").increment(1);
}

pub fn increment_oauth_grant_success(grant_type: &'static str) {
    counter!("oauth_grant_total", "grant" => grant_type, "result" => "success").increment(1);
}

pub fn increment_oauth_grant_failure(grant_type: &'static str) {
    counter!("oauth_grant_total", "grant" => grant_type, "result" => "failure").increment(1);
}

/// Business Logic Metrics
pub fn increment_activities_fetched(count: u64) {
    counter!("activities_fetched_total").increment(count);
}

pub fn set_year_ride_distance(year: i32, total_km: f64) {
    gauge!("year_ride_distance_km", "year" => year.to_string()).set(total_km);
}
