use serde::{Deserialize, Serialize};

use crate::models::domain::{LayerWeights, WEIGHT_SUM_TOLERANCE};

/// Body for POST /api/confluence/weights.
#[derive(Debug, Clone, Deserialize)]
pub struct WeightUpdateRequest {
    pub ta: f64,
    pub onchain: f64,
    pub celestial: f64,
    pub numerology: f64,
    pub sentiment: f64,
    pub political: f64,
    #[serde(rename = "macro")]
    pub macro_: f64,
    pub profile_name: Option<String>,
}

impl WeightUpdateRequest {
    pub fn to_weights(&self) -> LayerWeights {
        LayerWeights {
            ta: self.ta,
            onchain: self.onchain,
            celestial: self.celestial,
            numerology: self.numerology,
            sentiment: self.sentiment,
            political: self.political,
            macro_: self.macro_,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let weights = self.to_weights();
        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("Weights must sum to 1.0 +/- 1e-4 (got {sum:.6})"));
        }
        if !weights.is_valid() {
            return Err("Each weight must lie in [0, 1]".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightsResponse {
    pub profile: String,
    pub weights: LayerWeights,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfluenceQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub timeframe: Option<String>,
    pub limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ta: f64, macro_: f64) -> WeightUpdateRequest {
        WeightUpdateRequest {
            ta,
            onchain: 0.18,
            celestial: 0.14,
            numerology: 0.10,
            sentiment: 0.14,
            political: 0.14,
            macro_,
            profile_name: None,
        }
    }

    #[test]
    fn test_validate_accepts_unit_sum() {
        assert!(request(0.22, 0.08).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sum() {
        let err = request(0.30, 0.08).validate().unwrap_err();
        assert!(err.contains("sum to 1.0"));
    }

    #[test]
    fn test_validate_within_tolerance() {
        // 1e-5 off is inside the 1e-4 tolerance.
        assert!(request(0.22001, 0.07999).validate().is_ok());
    }
}
