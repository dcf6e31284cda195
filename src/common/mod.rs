pub mod metrics;
pub mod oauth;
pub mod strava_client;
pub mod token_store;
pub mod types;
