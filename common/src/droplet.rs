use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::Link;

pub type DropletGuid = String;
pub type PackageGuid = String;

/// Response of `GET /v3/apps/:guid/droplets/current`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Droplet {
    pub guid: DropletGuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub links: DropletLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropletLinks {
    #[serde(default)]
    pub package: Option<Link>,
}

impl Droplet {
    /// Package guid, taken from the last path segment of `links.package.href`.
    pub fn package_guid(&self) -> Option<&str> {
        let href = self.links.package.as_ref()?.href.trim_end_matches('/');
        href.rsplit('/').next().filter(|guid| !guid.is_empty())
    }
}
