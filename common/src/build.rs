use serde::{Deserialize, Serialize};
use std::fmt;

use crate::relationship::GuidRef;

pub type BuildGuid = String;

/// Build lifecycle as reported by `/v3/builds`. Only `Staged` means success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildState {
    Pending,
    Staging,
    Staged,
    Failed,
    Other(String),
}

impl From<String> for BuildState {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PENDING" => BuildState::Pending,
            "STAGING" => BuildState::Staging,
            "STAGED" => BuildState::Staged,
            "FAILED" => BuildState::Failed,
            _ => BuildState::Other(raw),
        }
    }
}

impl From<&str> for BuildState {
    fn from(raw: &str) -> Self {
        BuildState::from(raw.to_string())
    }
}

impl From<BuildState> for String {
    fn from(state: BuildState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Pending => f.write_str("PENDING"),
            BuildState::Staging => f.write_str("STAGING"),
            BuildState::Staged => f.write_str("STAGED"),
            BuildState::Failed => f.write_str("FAILED"),
            BuildState::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub guid: BuildGuid,
    pub state: BuildState,
    /// Set by the platform once the build is staged.
    #[serde(default)]
    pub droplet: Option<GuidRef>,
}

impl Build {
    pub fn droplet_guid(&self) -> Option<&str> {
        self.droplet.as_ref().map(|d| d.guid.as_str())
    }
}

/// Body of `POST /v3/builds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    pub package: GuidRef,
}

impl BuildRequest {
    pub fn for_package(package_guid: &str) -> Self {
        Self {
            package: GuidRef::new(package_guid),
        }
    }
}
