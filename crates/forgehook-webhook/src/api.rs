use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A hook as shown by the settings pages and the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiHook {
    pub id: i64,
    #[serde(rename = "type")]
    pub hook_type: String,
    pub url: String,
    pub config: BTreeMap<String, String>,
    pub events: Vec<String>,
    pub authorization_header: String,
    pub content_type: String,
    /// Provider settings decoded from the hook meta, when it has any.
    pub metadata: Option<serde_json::Value>,
    pub active: bool,
    pub branch_filter: String,
    pub settings_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
