use serde::{Deserialize, Serialize};

use crate::entities::alerts;

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsQuery {
    pub status: Option<String>,
    pub symbol: Option<String>,
    pub limit: Option<u64>,
}

impl AlertsQuery {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("active")
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.status() {
            "active" | "acknowledged" | "dismissed" | "all" => Ok(()),
            other => Err(format!(
                "Unknown status '{other}' (expected active, acknowledged, dismissed, or all)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    pub count: usize,
    pub alerts: Vec<alerts::Model>,
}
