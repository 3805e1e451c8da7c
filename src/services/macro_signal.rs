//! Macro liquidity scoring: five sub-signals, weighted composite, and a
//! regime label.
//!
//! Composite weights: liquidity 0.3, treasury 0.2, dollar 0.2, oil 0.1,
//! carry 0.2. Regime confidence is the absolute composite.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::domain::clamp_score;

pub const LIQUIDITY_WEIGHT: f64 = 0.3;
pub const TREASURY_WEIGHT: f64 = 0.2;
pub const DOLLAR_WEIGHT: f64 = 0.2;
pub const OIL_WEIGHT: f64 = 0.1;
pub const CARRY_WEIGHT: f64 = 0.2;

/// Everything the macro scorer reads, already windowed by the fetch layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroSnapshot {
    pub wti: Option<f64>,
    pub wti_30d_ago: Option<f64>,
    pub oil_inventory_change: Option<f64>,
    pub dxy: Option<f64>,
    pub dxy_20d_ago: Option<f64>,
    pub dgs10: Option<f64>,
    pub dgs10_20d_ago: Option<f64>,
    pub yield_curve_2s10s: Option<f64>,
    pub real_yield_10y: Option<f64>,
    pub m2: Option<f64>,
    pub m2_1y_ago: Option<f64>,
    pub net_liquidity: Option<f64>,
    pub net_liquidity_90d_ago: Option<f64>,
    pub usdjpy: Option<f64>,
    pub usdjpy_7d_ago: Option<f64>,
    pub usdjpy_sma_20: Option<f64>,
    pub usdjpy_atr_14: Option<f64>,
    pub vix: Option<f64>,
    pub jpy_positioning_z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroResult {
    pub liquidity_score: f64,
    pub treasury_score: f64,
    pub dollar_score: f64,
    pub oil_score: f64,
    pub carry_trade_score: f64,
    pub carry_stress: f64,
    pub regime: String,
    pub regime_confidence: f64,
    pub score: f64,
    pub sub_signals: Value,
}

/// WTI momentum: spikes are inflationary (bearish); stability is mildly
/// supportive. Inventory swings nudge the score.
pub fn oil_score(s: &MacroSnapshot) -> (f64, Value) {
    let Some(wti) = s.wti else {
        return (0.0, json!({"reason": "no_data"}));
    };
    let mut detail = json!({"wti": wti});
    let mut score = 0.0;

    if let Some(prior) = s.wti_30d_ago.filter(|p| *p > 0.0) {
        let pct_30d = (wti - prior) / prior * 100.0;
        detail["pct_30d"] = json!((pct_30d * 100.0).round() / 100.0);
        score = if pct_30d > 15.0 {
            -0.5 - ((pct_30d - 15.0) / 30.0).min(0.3)
        } else if pct_30d > 5.0 {
            -0.2 - (pct_30d - 5.0) / 50.0
        } else if pct_30d < -20.0 {
            -0.3
        } else if pct_30d < -10.0 {
            -0.1
        } else if pct_30d.abs() < 5.0 {
            0.15
        } else {
            0.0
        };
    }

    if let Some(inv) = s.oil_inventory_change {
        detail["inventory_change"] = json!(inv);
        if inv > 5_000.0 {
            score += 0.1;
        } else if inv < -5_000.0 {
            score -= 0.1;
        }
    }

    let score = clamp_score(score);
    detail["score"] = json!(score);
    (score, detail)
}

/// Inverted DXY: dollar strength drains risk appetite.
pub fn dollar_score(s: &MacroSnapshot) -> (f64, Value) {
    let Some(dxy) = s.dxy else {
        return (0.0, json!({"reason": "no_data"}));
    };
    let mut detail = json!({"dxy": dxy});

    let mut score = if dxy > 130.0 {
        -0.7
    } else if dxy > 125.0 {
        -0.4 - (dxy - 125.0) * 0.06
    } else if dxy > 120.0 {
        -0.2
    } else if dxy < 110.0 {
        0.5
    } else if dxy < 115.0 {
        0.3
    } else {
        0.0
    };

    if let Some(prior) = s.dxy_20d_ago.filter(|p| *p > 0.0) {
        let pct = (dxy - prior) / prior * 100.0;
        detail["pct_20d"] = json!((pct * 100.0).round() / 100.0);
        if pct > 2.0 {
            score -= 0.2;
        } else if pct > 1.0 {
            score -= 0.1;
        } else if pct < -2.0 {
            score += 0.2;
        } else if pct < -1.0 {
            score += 0.1;
        }
    }

    let score = clamp_score(score);
    detail["score"] = json!(score);
    (score, detail)
}

/// 10Y momentum, curve shape, and real yields.
pub fn treasury_score(s: &MacroSnapshot) -> (f64, Value) {
    if s.dgs10.is_none() && s.yield_curve_2s10s.is_none() && s.real_yield_10y.is_none() {
        return (0.0, json!({"reason": "no_data"}));
    }
    let mut detail = json!({});
    let mut score = 0.0;

    if let (Some(dgs10), Some(prior)) = (s.dgs10, s.dgs10_20d_ago) {
        detail["dgs10"] = json!(dgs10);
        let change = dgs10 - prior;
        detail["dgs10_change_20d"] = json!((change * 10_000.0).round() / 10_000.0);
        if change > 0.5 {
            score -= 0.6;
        } else if change > 0.3 {
            score -= 0.4;
        } else if change > 0.1 {
            score -= 0.2;
        } else if change < -0.3 {
            score += 0.4;
        } else if change < -0.1 {
            score += 0.2;
        }
    }

    if let Some(curve) = s.yield_curve_2s10s {
        detail["yield_curve_2s10s"] = json!(curve);
        if curve < -0.5 {
            score -= 0.2;
        } else if curve < 0.0 {
            score -= 0.1;
        } else if curve > 0.5 {
            score += 0.3;
        } else {
            score += 0.1;
        }
    }

    if let Some(real) = s.real_yield_10y {
        detail["real_yield_10y"] = json!(real);
        if real > 2.5 {
            score -= 0.3;
        } else if real > 2.0 {
            score -= 0.15;
        } else if real < 0.5 {
            score += 0.2;
        } else if real < 1.0 {
            score += 0.1;
        }
    }

    let score = clamp_score(score);
    detail["score"] = json!(score);
    (score, detail)
}

/// M2 YoY bands plus the 90-day net-liquidity trend.
pub fn liquidity_score(s: &MacroSnapshot) -> (f64, Value) {
    let Some(m2) = s.m2 else {
        return (0.0, json!({"reason": "no_data"}));
    };
    let mut detail = json!({"m2": m2});
    let mut score = 0.0;

    if let Some(prior) = s.m2_1y_ago.filter(|p| *p > 0.0) {
        let yoy = (m2 - prior) / prior * 100.0;
        detail["m2_yoy_pct"] = json!((yoy * 100.0).round() / 100.0);
        score = if yoy > 5.0 {
            0.8
        } else if yoy > 2.0 {
            0.4 + (yoy - 2.0) / 7.5
        } else if yoy > 0.0 {
            0.2
        } else if yoy < -3.0 {
            -0.8
        } else if yoy < -1.0 {
            -0.4 - (yoy.abs() - 1.0) / 5.0
        } else {
            -0.2
        };
    }

    if let (Some(net), Some(net_prior)) = (s.net_liquidity, s.net_liquidity_90d_ago) {
        detail["net_liquidity"] = json!(net);
        if net > net_prior {
            score += 0.15;
        } else {
            score -= 0.15;
        }
    }

    let score = clamp_score(score);
    detail["score"] = json!(score);
    (score, detail)
}

/// Carry stress 0..1 (0.40 forex + 0.30 vix + 0.30 positioning) and the
/// signed score used by the composite.
pub fn carry_trade_score(s: &MacroSnapshot) -> (f64, f64, Value) {
    let Some(usdjpy) = s.usdjpy else {
        return (0.0, 0.0, json!({"reason": "no_data"}));
    };
    let mut detail = json!({"usdjpy": usdjpy});

    let mut forex_stress = 0.0;
    if let (Some(sma), Some(atr)) = (s.usdjpy_sma_20, s.usdjpy_atr_14) {
        if atr > 0.0 {
            forex_stress = (((sma - usdjpy) / atr) / 3.0).clamp(0.0, 1.0);
            detail["forex_stress"] = json!((forex_stress * 10_000.0).round() / 10_000.0);
        }
    }

    let mut weekly_pct = 0.0;
    if let Some(prior) = s.usdjpy_7d_ago.filter(|p| *p > 0.0) {
        weekly_pct = (usdjpy - prior) / prior * 100.0;
        detail["usdjpy_weekly_pct"] = json!((weekly_pct * 100.0).round() / 100.0);
    }

    let mut vix_stress = 0.0;
    if let Some(vix) = s.vix {
        detail["vix"] = json!(vix);
        vix_stress = if vix > 35.0 {
            1.0
        } else if vix > 30.0 {
            0.7
        } else if vix > 25.0 {
            0.4
        } else if vix > 20.0 {
            0.15
        } else {
            0.0
        };
    }

    let mut positioning_stress = 0.0;
    if let Some(z) = s.jpy_positioning_z {
        detail["jpy_zscore"] = json!(z);
        positioning_stress = if z < -2.0 {
            0.8
        } else if z < -1.5 {
            0.5
        } else if z < -1.0 {
            0.3
        } else {
            0.0
        };
    }

    let carry_stress =
        (0.40 * forex_stress + 0.30 * vix_stress + 0.30 * positioning_stress).clamp(0.0, 1.0);
    detail["carry_stress"] = json!((carry_stress * 10_000.0).round() / 10_000.0);

    let mut score = if weekly_pct < -5.0 {
        -0.8
    } else if weekly_pct < -2.0 {
        -0.4
    } else if vix_stress > 0.5 && forex_stress > 0.3 {
        -0.9
    } else if carry_stress < 0.2 {
        0.2
    } else if carry_stress < 0.4 {
        0.0
    } else if carry_stress < 0.6 {
        -0.2
    } else if carry_stress < 0.8 {
        -0.5
    } else {
        -0.8
    };
    if positioning_stress > 0.5 {
        score -= 0.2;
    }

    let score = clamp_score(score);
    detail["score"] = json!(score);
    (score, carry_stress, detail)
}

/// Regime rule table. Carry unwind dominates; tightening/easing need two of
/// three sub-signals; risk_off/risk_on fall out of stress and sign agreement.
pub fn classify_regime(
    liquidity: f64,
    treasury: f64,
    dollar: f64,
    carry_stress: f64,
) -> &'static str {
    if carry_stress > 0.7 {
        return "carry_unwind";
    }
    let tightening = [treasury < -0.3, dollar < -0.3, liquidity < -0.3]
        .iter()
        .filter(|b| **b)
        .count();
    if tightening >= 2 {
        return "tightening";
    }
    let easing = [treasury > 0.3, liquidity > 0.3, dollar > 0.2]
        .iter()
        .filter(|b| **b)
        .count();
    if easing >= 2 {
        return "easing";
    }
    if carry_stress > 0.4 && (treasury < 0.0 || dollar < 0.0) {
        return "risk_off";
    }
    if liquidity > 0.2 && treasury > 0.0 && dollar > 0.0 {
        return "risk_on";
    }
    "neutral"
}

pub fn compute_macro_signal(s: &MacroSnapshot) -> MacroResult {
    let (oil, oil_detail) = oil_score(s);
    let (dollar, dollar_detail) = dollar_score(s);
    let (treasury, treasury_detail) = treasury_score(s);
    let (liquidity, liquidity_detail) = liquidity_score(s);
    let (carry, carry_stress, carry_detail) = carry_trade_score(s);

    let score = clamp_score(
        LIQUIDITY_WEIGHT * liquidity
            + TREASURY_WEIGHT * treasury
            + DOLLAR_WEIGHT * dollar
            + OIL_WEIGHT * oil
            + CARRY_WEIGHT * carry,
    );
    let regime = classify_regime(liquidity, treasury, dollar, carry_stress);

    MacroResult {
        liquidity_score: liquidity,
        treasury_score: treasury,
        dollar_score: dollar,
        oil_score: oil,
        carry_trade_score: carry,
        carry_stress,
        regime: regime.to_string(),
        regime_confidence: score.abs(),
        score,
        sub_signals: json!({
            "oil": oil_detail,
            "dollar": dollar_detail,
            "treasury": treasury_detail,
            "liquidity": liquidity_detail,
            "carry_trade": carry_detail,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_weights() {
        // Only M2 expanding: composite = 0.3 * 0.8.
        let s = MacroSnapshot {
            m2: Some(106.0),
            m2_1y_ago: Some(100.0),
            ..Default::default()
        };
        let r = compute_macro_signal(&s);
        assert!((r.liquidity_score - 0.8).abs() < 1e-9);
        assert!((r.score - 0.24).abs() < 1e-9);
        assert!((r.regime_confidence - r.score.abs()).abs() < 1e-9);
    }

    #[test]
    fn test_carry_unwind_regime() {
        let s = MacroSnapshot {
            usdjpy: Some(140.0),
            usdjpy_sma_20: Some(152.0),
            usdjpy_atr_14: Some(1.5),
            vix: Some(40.0),
            jpy_positioning_z: Some(-2.5),
            ..Default::default()
        };
        let (_, stress, _) = carry_trade_score(&s);
        assert!(stress > 0.7, "stress was {stress}");
        let r = compute_macro_signal(&s);
        assert_eq!(r.regime, "carry_unwind");
        assert!(r.carry_trade_score < -0.5);
    }

    #[test]
    fn test_tightening_regime() {
        assert_eq!(classify_regime(-0.5, -0.4, -0.4, 0.1), "tightening");
        assert_eq!(classify_regime(0.5, 0.4, 0.3, 0.1), "easing");
        assert_eq!(classify_regime(0.3, 0.1, 0.1, 0.1), "risk_on");
        assert_eq!(classify_regime(0.0, -0.1, 0.0, 0.5), "risk_off");
        assert_eq!(classify_regime(0.0, 0.0, 0.0, 0.0), "neutral");
    }

    #[test]
    fn test_usdjpy_crash_is_bearish() {
        let s = MacroSnapshot {
            usdjpy: Some(135.0),
            usdjpy_7d_ago: Some(150.0), // -10% in a week
            ..Default::default()
        };
        let (score, _, _) = carry_trade_score(&s);
        assert_eq!(score, -0.8);
    }

    #[test]
    fn test_missing_everything_is_neutral() {
        let r = compute_macro_signal(&MacroSnapshot::default());
        assert_eq!(r.score, 0.0);
        assert_eq!(r.regime, "neutral");
    }

    #[test]
    fn test_dollar_inversion() {
        let strong = MacroSnapshot {
            dxy: Some(132.0),
            ..Default::default()
        };
        assert!(dollar_score(&strong).0 < 0.0);

        let weak = MacroSnapshot {
            dxy: Some(108.0),
            ..Default::default()
        };
        assert!(dollar_score(&weak).0 > 0.0);
    }
}
