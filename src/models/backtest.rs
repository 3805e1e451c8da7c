use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Body for POST /api/backtest/cycle.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CycleBacktestRequest {
    pub symbol: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub period_days: i64,
    pub tolerance_days: Option<i64>,
    pub min_drop_pct: Option<f64>,
}

impl CycleBacktestRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.start >= self.end {
            return Err("start must precede end".to_string());
        }
        if self.period_days < 2 {
            return Err("period_days must be at least 2".to_string());
        }
        if let Some(pct) = self.min_drop_pct {
            if !(0.1..=90.0).contains(&pct) {
                return Err("min_drop_pct must lie in [0.1, 90]".to_string());
            }
        }
        Ok(())
    }
}

/// Body for POST /api/backtest/signals.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalBacktestRequest {
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub threshold: Option<f64>,
    pub optimize_weights: Option<bool>,
    pub granularity: Option<f64>,
    pub top_k: Option<usize>,
}

impl SignalBacktestRequest {
    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.5)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.start >= self.end {
            return Err("start must precede end".to_string());
        }
        if !(0.05..=0.95).contains(&self.threshold()) {
            return Err("threshold must lie in [0.05, 0.95]".to_string());
        }
        if let Some(g) = self.granularity {
            if !(0.05..=0.5).contains(&g) {
                return Err("granularity must lie in [0.05, 0.5]".to_string());
            }
        }
        Ok(())
    }
}
