use common::AppState;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RESTART_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MIN_AGE_DAYS: u32 = 0;
pub const DEFAULT_STATE: &str = "started";
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for one sweep. Built once from the command line, then only read.
#[derive(Debug, Clone)]
pub struct RestageConfig {
    /// Only apps in this state are restaged.
    pub state_filter: AppState,
    /// Apps whose current droplet is younger than this are skipped.
    pub min_age_days: u32,
    pub stage_timeout: Duration,
    pub restart_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RestageConfig {
    fn default() -> Self {
        Self {
            state_filter: AppState::from(DEFAULT_STATE),
            min_age_days: DEFAULT_MIN_AGE_DAYS,
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            restart_timeout: Duration::from_secs(DEFAULT_RESTART_TIMEOUT_SECS),
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Where the control plane lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub api: String,
    pub token: String,
    /// Current space; `None` lists every app the token can see.
    pub space_guid: Option<String>,
}

/// Values given explicitly on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct TargetOverrides {
    pub api: Option<String>,
    pub token: Option<String>,
    pub space_guid: Option<String>,
}

/// Subset of the cf CLI's `config.json` that identifies the current target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfConfigFile {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub space_fields: Option<SpaceFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceFields {
    #[serde(rename = "GUID", default)]
    pub guid: Option<String>,
}

/// `$CF_HOME/.cf/config.json`, falling back to `$HOME`.
pub fn cf_config_path() -> Option<PathBuf> {
    env::var_os("CF_HOME")
        .or_else(|| env::var_os("HOME"))
        .map(|home| PathBuf::from(home).join(".cf").join("config.json"))
}

pub fn load_cf_config(path: &Path) -> Result<CfConfigFile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Target {
    /// Overrides win; the cf config file is only read when something is
    /// still missing.
    pub fn resolve(overrides: TargetOverrides) -> Result<Self, ConfigError> {
        let complete = overrides.api.is_some() && overrides.token.is_some();
        let file = match cf_config_path() {
            Some(path) if !complete && path.exists() => Some(load_cf_config(&path)?),
            _ => None,
        };
        Self::merge(overrides, file.unwrap_or_default())
    }

    pub fn merge(overrides: TargetOverrides, file: CfConfigFile) -> Result<Self, ConfigError> {
        let api = non_empty(overrides.api)
            .or_else(|| non_empty(file.target))
            .ok_or(ConfigError::MissingApi)?;
        if !api.starts_with("http://") && !api.starts_with("https://") {
            return Err(ConfigError::InvalidApi(api));
        }

        let token = non_empty(overrides.token)
            .or_else(|| non_empty(file.access_token))
            .ok_or(ConfigError::MissingToken)?;

        let space_guid = non_empty(overrides.space_guid)
            .or_else(|| non_empty(file.space_fields.and_then(|s| s.guid)));

        Ok(Self {
            api: api.trim_end_matches('/').to_string(),
            token,
            space_guid,
        })
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        if self.token.to_ascii_lowercase().starts_with("bearer ") {
            self.token.clone()
        } else {
            format!("bearer {}", self.token)
        }
    }
}
