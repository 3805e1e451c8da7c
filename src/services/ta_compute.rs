//! Technical-analysis indicator computation and scoring.
//!
//! Indicators are computed from plain OHLCV slices so the same code path
//! serves the live producer and the backtester. The composite TA score is the
//! arithmetic mean of the contributing non-zero sub-signals, clamped to
//! [-1, +1].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::clamp_score;

/// Minimum candles for the full indicator set (SMA-200 plus slack).
pub const MIN_CANDLES: usize = 200;

/// Zig-zag pivot confirmation window for swing detection.
pub const SWING_WINDOW: usize = 20;

/// A single OHLCV bar as plain floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlcv {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Fibonacci retracement levels for the most recent swing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevels {
    pub fib_0: f64,
    pub fib_236: f64,
    pub fib_382: f64,
    pub fib_500: f64,
    pub fib_618: f64,
    pub fib_786: f64,
    pub fib_1000: f64,
}

impl FibLevels {
    pub fn levels(&self) -> [f64; 7] {
        [
            self.fib_0,
            self.fib_236,
            self.fib_382,
            self.fib_500,
            self.fib_618,
            self.fib_786,
            self.fib_1000,
        ]
    }
}

/// Latest-bar indicator values plus the crossing flags derived from the
/// series, so scoring is a pure function of this struct.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    pub close: f64,
    pub rsi_7: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub atr_14: Option<f64>,
    pub fib: Option<FibLevels>,
    /// MACD line crossed the signal line on this bar or the previous one.
    pub macd_cross_up: bool,
    pub macd_cross_down: bool,
    /// SMA-50 crossed SMA-200 within the last 3 bars.
    pub golden_cross: bool,
    pub death_cross: bool,
}

/// One contributing sub-signal, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSignal {
    pub name: String,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Series primitives
// ---------------------------------------------------------------------------

pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if values.is_empty() || period == 0 {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut current = values[0];
    out[0] = Some(current);
    for i in 1..values.len() {
        current = alpha * values[i] + (1.0 - alpha) * current;
        out[i] = Some(current);
    }
    out
}

/// RSI with Wilder smoothing (SMA seed, then alpha = 1/period).
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if closes.len() <= period {
        return out;
    }
    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));
    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let ema_fast = ema(closes, fast);
    let ema_slow = ema(closes, slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f.unwrap_or(0.0) - s.unwrap_or(0.0))
        .collect();
    let signal_line = ema(&line, signal);
    let line_opt: Vec<Option<f64>> = line.iter().map(|v| Some(*v)).collect();
    let histogram: Vec<Option<f64>> = line_opt
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();
    (line_opt, signal_line, histogram)
}

pub fn stochastic(bars: &[Ohlcv], k_period: usize, d_period: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut k = vec![None; bars.len()];
    for i in (k_period - 1)..bars.len() {
        let window = &bars[i + 1 - k_period..=i];
        let hh = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let ll = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let denom = hh - ll;
        if denom > 0.0 {
            k[i] = Some(100.0 * (bars[i].close - ll) / denom);
        }
    }
    // %D is the SMA of available %K values.
    let mut d = vec![None; bars.len()];
    for i in 0..bars.len() {
        if i + 1 >= d_period {
            let window = &k[i + 1 - d_period..=i];
            if window.iter().all(|v| v.is_some()) {
                let sum: f64 = window.iter().map(|v| v.unwrap()).sum();
                d[i] = Some(sum / d_period as f64);
            }
        }
    }
    (k, d)
}

pub fn bollinger(closes: &[f64], period: usize, std_dev: f64) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = sma(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];
    for i in (period - 1)..closes.len() {
        if let Some(m) = middle[i] {
            let window = &closes[i + 1 - period..=i];
            let var: f64 =
                window.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (period as f64 - 1.0);
            let sd = var.sqrt();
            upper[i] = Some(m + std_dev * sd);
            lower[i] = Some(m - std_dev * sd);
        }
    }
    (upper, middle, lower)
}

/// ATR with Wilder smoothing.
pub fn atr(bars: &[Ohlcv], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if bars.len() <= period {
        return out;
    }
    let tr = |i: usize| -> f64 {
        let b = &bars[i];
        if i == 0 {
            return b.high - b.low;
        }
        let prev_close = bars[i - 1].close;
        (b.high - b.low)
            .max((b.high - prev_close).abs())
            .max((b.low - prev_close).abs())
    };
    let mut current: f64 = (0..period).map(tr).sum::<f64>() / period as f64;
    out[period - 1] = Some(current);
    for i in period..bars.len() {
        current = (current * (period as f64 - 1.0) + tr(i)) / period as f64;
        out[i] = Some(current);
    }
    out
}

/// Most recent confirmed swing via N-bar zig-zag pivots: a pivot is a bar
/// that is the extreme of the window centered on it. The last confirmed
/// pivot high/low pair spans the retracement.
pub fn fibonacci_from_swing(bars: &[Ohlcv], window: usize) -> Option<FibLevels> {
    if bars.len() < 2 * window + 1 {
        return None;
    }
    let mut last_high: Option<f64> = None;
    let mut last_low: Option<f64> = None;
    // Pivots in the last bars cannot be confirmed yet; stop `window` early.
    for i in window..bars.len() - window {
        let w = &bars[i - window..=i + window];
        let h = w.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let l = w.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        if bars[i].high == h {
            last_high = Some(bars[i].high);
        }
        if bars[i].low == l {
            last_low = Some(bars[i].low);
        }
    }
    let (high, low) = (last_high?, last_low?);
    if high <= low {
        return None;
    }
    let diff = high - low;
    Some(FibLevels {
        fib_0: high,
        fib_236: high - 0.236 * diff,
        fib_382: high - 0.382 * diff,
        fib_500: high - 0.500 * diff,
        fib_618: high - 0.618 * diff,
        fib_786: high - 0.786 * diff,
        fib_1000: low,
    })
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

fn crossed_up(a: &[Option<f64>], b: &[Option<f64>], at: usize) -> bool {
    if at == 0 {
        return false;
    }
    match (a[at - 1], b[at - 1], a[at], b[at]) {
        (Some(ap), Some(bp), Some(ac), Some(bc)) => ap <= bp && ac > bc,
        _ => false,
    }
}

fn crossed_within(a: &[Option<f64>], b: &[Option<f64>], last: usize, bars: usize, up: bool) -> bool {
    let from = last.saturating_sub(bars - 1);
    (from..=last).any(|i| {
        if up {
            crossed_up(a, b, i)
        } else {
            crossed_up(b, a, i)
        }
    })
}

/// Compute the full indicator set for the latest bar. Bars must be oldest
/// first. Returns None when fewer than 2 bars are supplied; individual
/// indicators are None until their warm-up period is met.
pub fn compute_indicators(bars: &[Ohlcv]) -> Option<IndicatorSet> {
    if bars.len() < 2 {
        return None;
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let last = closes.len() - 1;

    let rsi_7 = rsi(&closes, 7);
    let rsi_14 = rsi(&closes, 14);
    let (macd_line, macd_signal, macd_histogram) = macd(&closes, 12, 26, 9);
    let (stoch_k, stoch_d) = stochastic(bars, 14, 3);
    let sma_20 = sma(&closes, 20);
    let sma_50 = sma(&closes, 50);
    let sma_200 = sma(&closes, 200);
    let ema_12 = ema(&closes, 12);
    let ema_26 = ema(&closes, 26);
    let (bb_upper, bb_middle, bb_lower) = bollinger(&closes, 20, 2.0);
    let atr_14 = atr(bars, 14);
    let fib = fibonacci_from_swing(bars, SWING_WINDOW);

    Some(IndicatorSet {
        close: closes[last],
        rsi_7: rsi_7[last],
        rsi_14: rsi_14[last],
        macd_line: macd_line[last],
        macd_signal: macd_signal[last],
        macd_histogram: macd_histogram[last],
        stoch_k: stoch_k[last],
        stoch_d: stoch_d[last],
        sma_20: sma_20[last],
        sma_50: sma_50[last],
        sma_200: sma_200[last],
        ema_12: ema_12[last],
        ema_26: ema_26[last],
        bb_upper: bb_upper[last],
        bb_middle: bb_middle[last],
        bb_lower: bb_lower[last],
        atr_14: atr_14[last],
        fib,
        // Sticky for one bar: the crossing bar plus the bar after it.
        macd_cross_up: crossed_within(&macd_line, &macd_signal, last, 2, true),
        macd_cross_down: crossed_within(&macd_line, &macd_signal, last, 2, false),
        golden_cross: crossed_within(&sma_50, &sma_200, last, 3, true),
        death_cross: crossed_within(&sma_50, &sma_200, last, 3, false),
    })
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Composite TA score: arithmetic mean of contributing non-zero sub-signals.
/// A sub-signal that produces NaN is dropped rather than poisoning the mean.
pub fn compute_ta_score(ind: &IndicatorSet) -> (f64, Vec<SubSignal>) {
    let mut subs: Vec<SubSignal> = Vec::new();
    let mut push = |name: &str, value: f64| {
        if value != 0.0 && value.is_finite() {
            subs.push(SubSignal {
                name: name.to_string(),
                value,
            });
        }
    };

    if let Some(rsi) = ind.rsi_14 {
        if rsi > 70.0 {
            push("rsi_overbought", -((rsi - 70.0) / 30.0).min(1.0));
        } else if rsi < 30.0 {
            push("rsi_oversold", ((30.0 - rsi) / 30.0).min(1.0));
        }
    }

    if ind.macd_cross_up {
        push("macd_cross_up", 0.3);
    } else if ind.macd_cross_down {
        push("macd_cross_down", -0.3);
    }

    if let (Some(upper), Some(lower)) = (ind.bb_upper, ind.bb_lower) {
        if ind.close < lower {
            push("bb_breach_lower", 0.3);
        } else if ind.close > upper {
            push("bb_breach_upper", -0.3);
        }
    }

    if ind.golden_cross {
        push("golden_cross", 0.4);
    } else if ind.death_cross {
        push("death_cross", -0.4);
    }

    if let (Some(fib), Some(atr)) = (ind.fib, ind.atr_14) {
        let near = fib
            .levels()
            .iter()
            .any(|level| (ind.close - level).abs() <= 0.25 * atr);
        if near {
            let trend = match ind.sma_50 {
                Some(s50) if ind.close < s50 => -1.0,
                Some(_) => 1.0,
                None => match ind.sma_20 {
                    Some(s20) if ind.close < s20 => -1.0,
                    _ => 1.0,
                },
            };
            push("fib_proximity", trend * 0.2);
        }
    }

    if subs.is_empty() {
        return (0.0, subs);
    }
    let mean = subs.iter().map(|s| s.value).sum::<f64>() / subs.len() as f64;
    (clamp_score(mean), subs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bars_from_closes(closes: &[f64]) -> Vec<Ohlcv> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Ohlcv {
                timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                open: *c,
                high: *c * 1.001,
                low: *c * 0.999,
                close: *c,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[4], Some(4.0));
    }

    #[test]
    fn test_rsi_bounds_and_direction() {
        let rising: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&rising, 14);
        let last = out.last().unwrap().unwrap();
        assert!(last > 70.0, "monotone rise should read overbought, got {last}");

        let falling: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let out = rsi(&falling, 14);
        let last = out.last().unwrap().unwrap();
        assert!(last < 30.0, "monotone fall should read oversold, got {last}");
    }

    #[test]
    fn test_rsi_oversold_sub_signal_is_linear() {
        let ind = IndicatorSet {
            close: 100.0,
            rsi_14: Some(15.0),
            ..Default::default()
        };
        let (score, subs) = compute_ta_score(&ind);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].name, "rsi_oversold");
        assert!((subs[0].value - 0.5).abs() < 1e-9);
        assert!((score - 0.5).abs() < 1e-9);

        let ind = IndicatorSet {
            close: 100.0,
            rsi_14: Some(100.0),
            ..Default::default()
        };
        let (score, _) = compute_ta_score(&ind);
        assert!((score + 1.0).abs() < 1e-9, "RSI 100 maps to -1");
    }

    #[test]
    fn test_bollinger_breach_signals() {
        let ind = IndicatorSet {
            close: 90.0,
            bb_upper: Some(110.0),
            bb_lower: Some(95.0),
            ..Default::default()
        };
        let (score, subs) = compute_ta_score(&ind);
        assert_eq!(subs[0].name, "bb_breach_lower");
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_cross_detection_window() {
        // SMA-50 stand-in crosses the SMA-200 stand-in between index 5 and 6.
        let slow: Vec<Option<f64>> = vec![Some(100.0); 10];
        let fast: Vec<Option<f64>> = (0..10)
            .map(|i| Some(if i <= 5 { 98.0 } else { 103.0 }))
            .collect();

        assert!(crossed_up(&fast, &slow, 6));
        assert!(!crossed_up(&fast, &slow, 5));
        assert!(!crossed_up(&fast, &slow, 7), "no re-cross after the event");

        // The 3-bar stickiness window: bars 6, 7, 8 see the cross; bar 9 no
        // longer does.
        assert!(crossed_within(&fast, &slow, 6, 3, true));
        assert!(crossed_within(&fast, &slow, 8, 3, true));
        assert!(!crossed_within(&fast, &slow, 9, 3, true));
        assert!(!crossed_within(&fast, &slow, 8, 3, false), "not a death cross");
    }

    #[test]
    fn test_golden_cross_scores_exactly_plus_point_four_alone() {
        // A golden-cross tick with every other sub-signal quiet: RSI
        // mid-range, close inside the bands, no MACD cross, no fib
        // proximity.
        let ind = IndicatorSet {
            close: 100.0,
            rsi_14: Some(55.0),
            bb_upper: Some(110.0),
            bb_lower: Some(90.0),
            sma_50: Some(99.0),
            sma_200: Some(98.0),
            golden_cross: true,
            ..Default::default()
        };
        let (score, subs) = compute_ta_score(&ind);
        assert_eq!(subs.len(), 1, "only the golden cross contributes: {subs:?}");
        assert_eq!(subs[0].name, "golden_cross");
        assert!((subs[0].value - 0.4).abs() < 1e-9);
        assert!((score - 0.4).abs() < 1e-9);
        assert!((0.2..=1.0).contains(&score));

        // The mirror-image death cross.
        let ind = IndicatorSet {
            close: 100.0,
            rsi_14: Some(55.0),
            bb_upper: Some(110.0),
            bb_lower: Some(90.0),
            death_cross: true,
            ..Default::default()
        };
        let (score, _) = compute_ta_score(&ind);
        assert!((score + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_end_to_end_indicator_assembly() {
        // A long series exercises the full assembly path: every warm-up is
        // met and the flags stay consistent with the series.
        let closes: Vec<f64> = (0..260)
            .map(|i| 100.0 + (i as f64 * 0.35).sin() * 8.0 + i as f64 * 0.05)
            .collect();
        let bars = bars_from_closes(&closes);
        let ind = compute_indicators(&bars).unwrap();
        assert!(ind.rsi_14.is_some());
        assert!(ind.sma_200.is_some());
        assert!(ind.bb_upper.is_some());
        assert!(ind.atr_14.unwrap() > 0.0);
        assert!(ind.fib.is_some());
        assert!(!(ind.golden_cross && ind.death_cross));
        let (score, _) = compute_ta_score(&ind);
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn test_clamp_on_injected_outlier() {
        let mut ind = IndicatorSet {
            close: 100.0,
            rsi_14: Some(10.0),
            ..Default::default()
        };
        ind.macd_cross_up = true;
        let (score, mut subs) = compute_ta_score(&ind);
        assert!(score <= 1.0);
        // Inject an out-of-range sub-signal and re-average manually.
        subs.push(SubSignal {
            name: "injected".into(),
            value: 3.0,
        });
        let mean = subs.iter().map(|s| s.value).sum::<f64>() / subs.len() as f64;
        assert!(clamp_score(mean) <= 1.0);
    }

    #[test]
    fn test_indicators_deterministic() {
        let closes: Vec<f64> = (0..220).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bars = bars_from_closes(&closes);
        let a = compute_indicators(&bars).unwrap();
        let b = compute_indicators(&bars).unwrap();
        assert_eq!(a.rsi_14, b.rsi_14);
        assert_eq!(a.macd_line, b.macd_line);
        assert_eq!(compute_ta_score(&a).0, compute_ta_score(&b).0);
    }

    #[test]
    fn test_atr_positive() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let bars = bars_from_closes(&closes);
        let out = atr(&bars, 14);
        assert!(out.last().unwrap().unwrap() > 0.0);
    }
}
