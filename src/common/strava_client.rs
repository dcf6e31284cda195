use crate::common::metrics;
use crate::common::types::{Activity, CommuteError, CommuteResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const STRAVA_OAUTH_BASE: &str = "https://www.strava.com/oauth";

pub const ACTIVITIES_PER_PAGE: u32 = 200;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Query for one page of the athlete activities list. Pages start at 1.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageQuery {
    pub before: i64,
    pub after: i64,
    pub page: u32,
    pub per_page: u32,
}

// OAuth types
#[derive(Serialize)]
pub struct OAuthTokenRequest<'a> {
    pub client_id: u64,
    pub client_secret: &'a str,
    pub grant_type: &'a str, // "authorization_code" or "refresh_token"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<i64>,
}

#[derive(Clone)]
pub struct StravaClient {
    client: reqwest::Client,
    api_base: String,
    oauth_base: String,
}

impl StravaClient {
    pub fn new() -> CommuteResult<Self> {
        Self::with_endpoints(STRAVA_API_BASE, STRAVA_OAUTH_BASE)
    }

    pub fn with_endpoints(api_base: &str, oauth_base: &str) -> CommuteResult<Self> {
        // No retry layer: any transport or protocol error is final for the caller
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            oauth_base: oauth_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn authorize_endpoint(&self) -> String {
        format!("{}/authorize", self.oauth_base)
    }

    pub async fn fetch_page(
        &self,
        access_token: &str,
        query: &PageQuery,
    ) -> CommuteResult<Vec<Activity>> {
        let path = format!("{}/athlete/activities", self.api_base);
        debug!("Fetching {} with {:?}", path, query);

        let response = self
            .client
            .get(path)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .inspect_err(|_e| {
                metrics::increment_strava_api_failure();
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            metrics::increment_strava_api_failure();
            return Err(CommuteError::rejected(status));
        }

        let body = response.text().await.inspect_err(|_e| {
            metrics::increment_strava_api_failure();
        })?;

        let activities: Vec<Activity> = serde_json::from_str(&body).map_err(|e| {
            metrics::increment_strava_api_failure();
            CommuteError::ResponseMalformed(format!("activities page {}: {e}", query.page))
        })?;

        metrics::increment_strava_api_success();
        Ok(activities)
    }

    pub async fn request_token(
        &self,
        request: &OAuthTokenRequest<'_>,
    ) -> CommuteResult<OAuthTokenResponse> {
        let path = format!("{}/token", self.oauth_base);
        info!("Requesting {} grant from {}", request.grant_type, path);

        let response = self
            .client
            .post(path)
            .form(request)
            .send()
            .await
            .inspect_err(|_e| {
                metrics::increment_strava_api_failure();
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            metrics::increment_strava_api_failure();
            return Err(CommuteError::rejected(status));
        }

        let response_text = response.text().await.inspect_err(|_e| {
            metrics::increment_strava_api_failure();
        })?;

        let token_response: OAuthTokenResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                metrics::increment_strava_api_failure();
                CommuteError::ResponseMalformed(format!("OAuth token response: {e}"))
            })?;

        metrics::increment_strava_api_success();
        Ok(token_response)
    }
}
