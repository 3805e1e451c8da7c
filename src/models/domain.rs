//! Core domain types shared by services, jobs, and handlers.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Candle interval. Coarse by design — nothing below 1m is stored and the
/// scoring pipeline runs on 1h and up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Timeframe::M1),
            "5m" => Some(Timeframe::M5),
            "1h" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of signal layers. Registration is static — the scheduler
/// and confluence engine iterate `Layer::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Ta,
    Onchain,
    Celestial,
    Numerology,
    Sentiment,
    Political,
    Macro,
}

impl Layer {
    pub const ALL: [Layer; 7] = [
        Layer::Ta,
        Layer::Onchain,
        Layer::Celestial,
        Layer::Numerology,
        Layer::Sentiment,
        Layer::Political,
        Layer::Macro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Ta => "ta",
            Layer::Onchain => "onchain",
            Layer::Celestial => "celestial",
            Layer::Numerology => "numerology",
            Layer::Sentiment => "sentiment",
            Layer::Political => "political",
            Layer::Macro => "macro",
        }
    }

    /// Whether layer-score rows carry a symbol (global layers do not).
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(self, Layer::Ta | Layer::Onchain | Layer::Sentiment)
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discretized composite score label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Strength {
    pub fn from_composite(composite: f64) -> Self {
        if composite >= 0.6 {
            Strength::StrongBuy
        } else if composite >= 0.2 {
            Strength::Buy
        } else if composite > -0.2 {
            Strength::Neutral
        } else if composite > -0.6 {
            Strength::Sell
        } else {
            Strength::StrongSell
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::StrongBuy => "strong_buy",
            Strength::Buy => "buy",
            Strength::Neutral => "neutral",
            Strength::Sell => "sell",
            Strength::StrongSell => "strong_sell",
        }
    }
}

/// Active weight profile as plain floats. Weights must sum to 1 ± 1e-4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub ta: f64,
    pub onchain: f64,
    pub celestial: f64,
    pub numerology: f64,
    pub sentiment: f64,
    pub political: f64,
    #[serde(rename = "macro")]
    pub macro_: f64,
}

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

impl LayerWeights {
    pub fn get(&self, layer: Layer) -> f64 {
        match layer {
            Layer::Ta => self.ta,
            Layer::Onchain => self.onchain,
            Layer::Celestial => self.celestial,
            Layer::Numerology => self.numerology,
            Layer::Sentiment => self.sentiment,
            Layer::Political => self.political,
            Layer::Macro => self.macro_,
        }
    }

    pub fn sum(&self) -> f64 {
        self.ta
            + self.onchain
            + self.celestial
            + self.numerology
            + self.sentiment
            + self.political
            + self.macro_
    }

    pub fn is_valid(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
            && Layer::ALL.iter().all(|l| {
                let w = self.get(*l);
                (0.0..=1.0).contains(&w)
            })
    }
}

impl Default for LayerWeights {
    fn default() -> Self {
        LayerWeights {
            ta: 0.22,
            onchain: 0.18,
            celestial: 0.14,
            numerology: 0.10,
            sentiment: 0.14,
            political: 0.14,
            macro_: 0.08,
        }
    }
}

/// Clamp any score-like value into the [-1, +1] band.
pub fn clamp_score(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = LayerWeights::default();
        assert!((w.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        assert!(w.is_valid());
    }

    #[test]
    fn test_strength_bands() {
        assert_eq!(Strength::from_composite(0.75), Strength::StrongBuy);
        assert_eq!(Strength::from_composite(0.6), Strength::StrongBuy);
        assert_eq!(Strength::from_composite(0.35), Strength::Buy);
        assert_eq!(Strength::from_composite(0.2), Strength::Buy);
        assert_eq!(Strength::from_composite(0.0), Strength::Neutral);
        assert_eq!(Strength::from_composite(-0.19), Strength::Neutral);
        assert_eq!(Strength::from_composite(-0.2), Strength::Sell);
        assert_eq!(Strength::from_composite(-0.6), Strength::StrongSell);
        assert_eq!(Strength::from_composite(-1.0), Strength::StrongSell);
    }

    #[test]
    fn test_timeframe_round_trip() {
        for tf in ["1m", "5m", "1h", "4h", "1d"] {
            assert_eq!(Timeframe::parse(tf).unwrap().as_str(), tf);
        }
        assert!(Timeframe::parse("15m").is_none());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(3.0), 1.0);
        assert_eq!(clamp_score(-2.5), -1.0);
        assert_eq!(clamp_score(0.47), 0.47);
    }
}
