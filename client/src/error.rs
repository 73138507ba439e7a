use thiserror::Error;

/// Failure of a single call against the control plane.
///
/// `Transport` and `Status` are both transport-level failures; `Status`
/// keeps the HTTP status and the API's own error detail.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned {status}: {detail}")]
    Status {
        method: String,
        path: String,
        status: u16,
        detail: String,
    },

    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("probe task stopped: {0}")]
    Probe(#[from] tokio::task::JoinError),
}

impl PlatformError {
    pub fn decode(path: &str, message: impl ToString) -> Self {
        PlatformError::Decode {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// Fatal failures of a sweep. Both end the process with exit code 1.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("{0}")]
    ListApplications(#[source] PlatformError),

    #[error("No apps to restage")]
    NoApplications,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API endpoint set; pass --api, set CF_API or run `cf api`")]
    MissingApi,

    #[error("no access token; pass --token, set CF_ACCESS_TOKEN or run `cf login`")]
    MissingToken,

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API endpoint {0}")]
    InvalidApi(String),
}
