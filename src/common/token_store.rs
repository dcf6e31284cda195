use crate::common::types::{CommuteError, CommuteResult, Secrets, TokenSet};
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SECRETS_FILE: &str = "./api_client_secrets.json";
pub const DEFAULT_TOKENS_FILE: &str = "./tokens.json";

/// JSON files holding the API application secrets and the OAuth tokens.
#[derive(Debug, Clone)]
pub struct TokenStore {
    secrets_path: PathBuf,
    tokens_path: PathBuf,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_FILE, DEFAULT_TOKENS_FILE)
    }
}

impl TokenStore {
    pub fn new(secrets_path: impl Into<PathBuf>, tokens_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
            tokens_path: tokens_path.into(),
        }
    }

    pub fn tokens_path(&self) -> &Path {
        &self.tokens_path
    }

    pub fn load_secrets(&self) -> CommuteResult<Secrets> {
        let secrets: Secrets = read_json(&self.secrets_path)?;
        debug!("Loaded secrets for client {}", secrets.client_id);
        Ok(secrets)
    }

    pub fn load_tokens(&self) -> CommuteResult<TokenSet> {
        let tokens: TokenSet = read_json(&self.tokens_path)?;
        debug!("Loaded tokens from {}", self.tokens_path.display());
        Ok(tokens)
    }

    /// Replaces the token file in one step: the previous file stays intact
    /// until the new contents are fully on disk.
    pub fn save_tokens(&self, tokens: &TokenSet) -> CommuteResult<()> {
        let data = serde_json::to_string_pretty(tokens).map_err(|source| CommuteError::Malformed {
            path: self.tokens_path.clone(),
            source,
        })?;

        let staging = staging_path(&self.tokens_path);
        write_synced(&staging, data.as_bytes())
            .and_then(|()| fs::rename(&staging, &self.tokens_path))
            .map_err(|source| {
                let _ = fs::remove_file(&staging);
                CommuteError::Io {
                    path: self.tokens_path.clone(),
                    source,
                }
            })?;

        debug!("Saved tokens to {}", self.tokens_path.display());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CommuteResult<T> {
    if path.is_dir() {
        return Err(CommuteError::NotFound(path.to_path_buf()));
    }

    let data = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => CommuteError::NotFound(path.to_path_buf()),
        _ => CommuteError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_str(&data).map_err(|source| CommuteError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
