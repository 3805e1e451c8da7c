//! Contrarian sentiment scoring from the Fear & Greed index, with optional
//! social/trends sources blended in at low weight.

use crate::models::domain::clamp_score;

/// Contrarian banding: deep fear is a buy, euphoria is a sell.
pub fn fear_greed_score(index: i32) -> f64 {
    match index {
        i32::MIN..=19 => 0.8,
        20..=39 => 0.3,
        40..=60 => 0.0,
        61..=80 => -0.3,
        _ => -0.8,
    }
}

pub fn fear_greed_label(index: i32) -> &'static str {
    match index {
        i32::MIN..=24 => "Extreme Fear",
        25..=44 => "Fear",
        45..=55 => "Neutral",
        56..=75 => "Greed",
        _ => "Extreme Greed",
    }
}

/// Weight applied to each optional auxiliary source.
const AUX_WEIGHT: f64 = 0.2;

pub fn compute_sentiment_score(
    fear_greed: i32,
    social: Option<f64>,
    trends: Option<f64>,
) -> f64 {
    let mut weighted = fear_greed_score(fear_greed);
    let mut total = 1.0;
    for aux in [social, trends].into_iter().flatten() {
        weighted += clamp_score(aux) * AUX_WEIGHT;
        total += AUX_WEIGHT;
    }
    clamp_score(weighted / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrarian_bands() {
        assert_eq!(fear_greed_score(0), 0.8);
        assert_eq!(fear_greed_score(19), 0.8);
        assert_eq!(fear_greed_score(20), 0.3);
        assert_eq!(fear_greed_score(39), 0.3);
        assert_eq!(fear_greed_score(40), 0.0);
        assert_eq!(fear_greed_score(60), 0.0);
        assert_eq!(fear_greed_score(61), -0.3);
        assert_eq!(fear_greed_score(80), -0.3);
        assert_eq!(fear_greed_score(81), -0.8);
        assert_eq!(fear_greed_score(100), -0.8);
    }

    #[test]
    fn test_aux_sources_blend() {
        // F&G alone.
        assert_eq!(compute_sentiment_score(10, None, None), 0.8);

        // One aux source at weight 0.2.
        let blended = compute_sentiment_score(10, Some(-1.0), None);
        let expected = (0.8 - 0.2) / 1.2;
        assert!((blended - expected).abs() < 1e-9);

        // Aux values are clamped before blending.
        let clamped = compute_sentiment_score(50, Some(5.0), None);
        assert!(clamped <= 1.0);
    }
}
