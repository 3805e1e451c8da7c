use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entities::custom_cycles;
use crate::services::cycle_tracker::CycleStatus;

/// Body for POST /api/cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCycleRequest {
    pub name: String,
    pub period_days: i32,
    pub anchor_date: NaiveDate,
    pub tolerance_days: Option<i32>,
    pub direction: Option<String>,
    pub reference_event: Option<String>,
    pub notes: Option<String>,
}

impl CreateCycleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        if self.period_days < 1 {
            return Err("period_days must be at least 1".to_string());
        }
        if let Some(t) = self.tolerance_days {
            if t < 0 || t as i64 * 2 >= self.period_days as i64 {
                return Err("tolerance_days must be non-negative and under half the period".to_string());
            }
        }
        if let Some(d) = &self.direction {
            if d != "bullish" && d != "bearish" {
                return Err("direction must be 'bullish' or 'bearish'".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CyclesResponse {
    pub count: usize,
    pub cycles: Vec<custom_cycles::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleCheckResponse {
    pub date: NaiveDate,
    pub aligned_count: usize,
    pub cycles: Vec<CycleStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_wide_tolerance() {
        let req = CreateCycleRequest {
            name: "weekly".into(),
            period_days: 7,
            anchor_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            tolerance_days: Some(4),
            direction: None,
            reference_event: None,
            notes: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_47_day() {
        let req = CreateCycleRequest {
            name: "47-day".into(),
            period_days: 47,
            anchor_date: NaiveDate::from_ymd_opt(2025, 10, 10).unwrap(),
            tolerance_days: Some(2),
            direction: Some("bearish".into()),
            reference_event: None,
            notes: None,
        };
        assert!(req.validate().is_ok());
    }
}
