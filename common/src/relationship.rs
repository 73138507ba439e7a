use serde::{Deserialize, Serialize};

/// `{ "guid": "..." }`, the reference shape used all over the v3 API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidRef {
    pub guid: String,
}

impl GuidRef {
    pub fn new(guid: &str) -> Self {
        Self {
            guid: guid.to_string(),
        }
    }
}

/// To-one relationship, e.g. `/v3/apps/:guid/relationships/current_droplet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: Option<GuidRef>,
}

impl Relationship {
    pub fn to(guid: &str) -> Self {
        Self {
            data: Some(GuidRef::new(guid)),
        }
    }

    pub fn guid(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.guid.as_str())
    }
}
