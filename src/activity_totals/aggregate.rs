use super::bounds::year_bounds;
use crate::common::metrics;
use crate::common::oauth::OAuthSession;
use crate::common::strava_client::{ACTIVITIES_PER_PAGE, PageQuery, StravaClient};
use crate::common::types::{Activity, CommuteResult, YearDistance};
use function_timer::time;
use std::sync::Arc;
use tracing::{debug, info, trace};

#[derive(Clone)]
pub struct YearAggregator {
    client: Arc<StravaClient>,
    session: Arc<OAuthSession>,
    per_page: u32,
}

impl YearAggregator {
    pub fn new(client: Arc<StravaClient>, session: Arc<OAuthSession>) -> Self {
        Self {
            client,
            session,
            per_page: ACTIVITIES_PER_PAGE,
        }
    }

    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Every activity of `year`, page by page until the provider returns an
    /// empty page.
    pub async fn fetch_year(&self, year: i32) -> CommuteResult<Vec<Activity>> {
        let (after, before) = year_bounds(year)?;
        info!("Fetching activities for {} ({} to {})", year, after, before);

        let mut activities = Vec::new();
        let mut page = 1;
        loop {
            let query = PageQuery {
                before,
                after,
                page,
                per_page: self.per_page,
            };
            let batch = self
                .client
                .fetch_page(self.session.access_token(), &query)
                .await?;
            if batch.is_empty() {
                break;
            }

            debug!("Year {} page {}: {} activities", year, page, batch.len());
            activities.extend(batch);
            page += 1;
        }

        metrics::increment_activities_fetched(activities.len() as u64);
        Ok(activities)
    }

    #[time("aggregate_year_duration")]
    pub async fn aggregate(&self, year: i32) -> CommuteResult<YearDistance> {
        let activities = self.fetch_year(year).await?;
        let distance = summarize(year, &activities);

        info!(
            "Year {}: {} activities, {:.1} km commute, {:.1} km pleasure",
            year,
            activities.len(),
            distance.commute,
            distance.pleasure
        );
        metrics::set_year_ride_distance(year, distance.total());
        Ok(distance)
    }
}

/// Folds activities into riding distances. Only `Ride` and `EBikeRide`
/// count; everything else is ignored.
pub fn summarize(year: i32, activities: &[Activity]) -> YearDistance {
    let mut total = 0.0;
    let mut commute = 0.0;

    for activity in activities.iter().filter(|a| a.is_ride()) {
        trace!("Counting activity: {}", activity.name);
        let distance = activity.distance_km();
        total += distance;
        if activity.commute {
            commute += distance;
        }
    }

    YearDistance {
        year,
        commute,
        pleasure: total - commute,
    }
}
