use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub next: Option<Link>,
}

/// Paginated list envelope used by every v3 collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub pagination: Pagination,
    pub resources: Vec<T>,
}

impl<T> Page<T> {
    pub fn next_href(&self) -> Option<&str> {
        self.pagination.next.as_ref().map(|l| l.href.as_str())
    }
}
