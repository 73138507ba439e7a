use serde::{Deserialize, Serialize};

/// Error envelope returned by the v3 API on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrors {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl ApiErrors {
    pub fn single(code: u64, title: &str, detail: &str) -> Self {
        Self {
            errors: vec![ApiError {
                code,
                title: title.to_string(),
                detail: detail.to_string(),
            }],
        }
    }

    pub fn first_detail(&self) -> Option<&str> {
        self.errors
            .iter()
            .map(|e| e.detail.as_str())
            .find(|d| !d.is_empty())
    }
}
