use serde::{Deserialize, Serialize};
use std::fmt;

pub type AppGuid = String;

/// Lifecycle state of an application.
///
/// The v3 API reports `STARTED` / `STOPPED`; the cf CLI plugin models use
/// lowercase. Parsing is case-insensitive and anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppState {
    Started,
    Stopped,
    Other(String),
}

impl From<String> for AppState {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "STARTED" => AppState::Started,
            "STOPPED" => AppState::Stopped,
            _ => AppState::Other(raw),
        }
    }
}

impl From<&str> for AppState {
    fn from(raw: &str) -> Self {
        AppState::from(raw.to_string())
    }
}

impl From<AppState> for String {
    fn from(state: AppState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Started => f.write_str("STARTED"),
            AppState::Stopped => f.write_str("STOPPED"),
            AppState::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub guid: AppGuid,
    pub name: String,
    pub state: AppState,
}
