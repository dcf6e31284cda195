use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// Strava launched in 2009, there is never data before this
pub const STRAVA_EPOCH_YEAR: i32 = 2009;

#[derive(Debug, thiserror::Error)]
pub enum CommuteError {
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Malformed file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status not 200: {} - {reason}", .status.as_u16())]
    AuthRejected { status: StatusCode, reason: String },
    #[error("Unable to parse the response: {0}")]
    ResponseMalformed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Task failed: {0}")]
    TaskFailed(String),
    #[error("Chart error: {0}")]
    Chart(String),
}

impl CommuteError {
    pub fn rejected(status: StatusCode) -> Self {
        CommuteError::AuthRejected {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

pub type CommuteResult<T> = Result<T, CommuteError>;

/// Client credentials of the registered API application.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Secrets {
    #[serde(rename = "ClientID", alias = "client_id")]
    pub client_id: u64,
    #[serde(rename = "ClientSecret", alias = "client_secret")]
    pub client_secret: String,
}

impl Secrets {
    pub fn validate(&self) -> CommuteResult<()> {
        if self.client_id == 0 || self.client_secret.is_empty() {
            return Err(CommuteError::InvalidConfiguration(
                "client id and client secret must both be set".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(rename = "AuthCode", alias = "auth_code", default)]
    pub auth_code: String,
    #[serde(rename = "RefreshToken", alias = "refresh_token", default)]
    pub refresh_token: String,
    #[serde(rename = "AccessToken", alias = "access_token", default)]
    pub access_token: String,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &str| if value.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("TokenSet")
            .field("auth_code", &redact(&self.auth_code))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Activity {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub distance: f64,
    #[serde(default)]
    pub commute: bool,
}

impl Activity {
    pub fn is_ride(&self) -> bool {
        matches!(self.activity_type.as_str(), "Ride" | "EBikeRide")
    }

    pub fn distance_km(&self) -> f64 {
        self.distance / 1000.0
    }
}

/// Riding distances for one calendar year, in kilometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearDistance {
    pub year: i32,
    pub commute: f64,
    pub pleasure: f64,
}

impl YearDistance {
    pub fn total(&self) -> f64 {
        self.commute + self.pleasure
    }
}

pub type ResultTable = BTreeMap<i32, YearDistance>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_validation() {
        let missing_id = Secrets {
            client_id: 0,
            client_secret: "secret".to_string(),
        };
        let missing_secret = Secrets {
            client_id: 1234,
            client_secret: String::new(),
        };
        let complete = Secrets {
            client_id: 1234,
            client_secret: "secret".to_string(),
        };

        assert!(matches!(
            missing_id.validate(),
            Err(CommuteError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            missing_secret.validate(),
            Err(CommuteError::InvalidConfiguration(_))
        ));
        assert!(complete.validate().is_ok());
    }

    #[test]
    fn test_secrets_accept_legacy_keys() {
        let secrets: Secrets =
            serde_json::from_str(r#"{"ClientID": 4242, "ClientSecret": "abc"}"#).unwrap();
        assert_eq!(secrets.client_id, 4242);
        assert_eq!(secrets.client_secret, "abc");

        let secrets: Secrets =
            serde_json::from_str(r#"{"client_id": 7, "client_secret": "xyz"}"#).unwrap();
        assert_eq!(secrets.client_id, 7);
    }

    #[test]
    fn test_debug_output_redacts_credentials() {
        let secrets = Secrets {
            client_id: 1,
            client_secret: "hunter2".to_string(),
        };
        let tokens = TokenSet {
            auth_code: String::new(),
            refresh_token: "refresh-abc".to_string(),
            access_token: "access-abc".to_string(),
        };

        assert!(!format!("{secrets:?}").contains("hunter2"));
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("refresh-abc"));
        assert!(!debug.contains("access-abc"));
        assert!(debug.contains("<empty>"));
    }

    #[test]
    fn test_activity_deserialization() {
        let activity: Activity = serde_json::from_str(
            r#"{"id": 1, "name": "Morning Commute", "type": "Ride", "distance": 10000.0, "commute": true, "elapsed_time": 1800}"#,
        )
        .unwrap();

        assert!(activity.is_ride());
        assert!(activity.commute);
        assert_eq!(activity.distance_km(), 10.0);
    }

    #[test]
    fn test_rejected_error_message_includes_status() {
        let err = CommuteError::rejected(StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "HTTP status not 200: 401 - Unauthorized");
    }
}
