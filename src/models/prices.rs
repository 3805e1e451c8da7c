use serde::{Deserialize, Serialize};

use crate::entities::candles;

/// Query parameters for GET /api/prices/{symbol}
#[derive(Debug, Clone, Deserialize)]
pub struct PricesQuery {
    pub timeframe: Option<String>,
    pub limit: Option<u64>,
}

impl PricesQuery {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricesResponse {
    pub symbol: String,
    pub timeframe: String,
    pub count: usize,
    pub data: Vec<candles::Model>,
}
