//! Sprout Social v1 API response types.
//!
//! Every endpoint wraps its payload in `{"data": [...]}`; the analytics
//! endpoint adds a `paging` object.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Paging {
    pub current_page: u32,
    pub total_pages: u32,
}

/// One entry of `metadata/customer/groups`.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    pub group_id: i64,
    pub name: String,
}

/// One entry of `metadata/customer`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    pub customer_profile_id: i64,
    pub network_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub native_name: Option<String>,
    #[serde(default)]
    pub groups: Vec<i64>,
}

/// Request body for `analytics/profiles`.
#[derive(Debug, Serialize)]
pub struct AnalyticsRequest {
    pub filters: Vec<String>,
    pub metrics: Vec<String>,
    pub page: u32,
}

/// One row of `analytics/profiles`: a profile and day plus its metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsRecord {
    pub dimensions: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub metrics: serde_json::Value,
}
