//! Backtesting: cycle-hypothesis validation over daily candles and full
//! signal replay through the live producers.
//!
//! The signal walker hands each producer the walker's instant as `at`;
//! producers only query `timestamp <= at`, which is the whole no-lookahead
//! discipline — there is no second code path to drift out of sync.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;

use crate::entities::prelude::{BacktestResults, Candles};
use crate::entities::{backtest_results, candles};
use crate::models::domain::{clamp_score, LayerWeights, Timeframe};
use crate::services::confluence_engine::{compute_composite, LayerScores};
use crate::services::{bounded_store, ephemeris, numerology, producers};

// ---------------------------------------------------------------------------
// Cycle backtester
// ---------------------------------------------------------------------------

/// Default significance rule: a 10% fall from the peak of the two prior days.
pub const DEFAULT_DRAWDOWN_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
    pub low: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub event_count: usize,
    pub event_dates: Vec<NaiveDate>,
    pub intervals: Vec<i64>,
    pub interval_distribution: BTreeMap<i64, usize>,
    pub matches: usize,
    pub expected_matches: f64,
    pub match_rate: f64,
    pub chi2: f64,
    pub p_value: f64,
    pub is_significant: bool,
    pub enrichments: Vec<EventEnrichment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnrichment {
    pub date: NaiveDate,
    pub lunar_phase: String,
    pub mercury_retrograde: bool,
    pub retrograde_count: i32,
    pub universal_day_number: u32,
    pub is_master_number: bool,
}

/// Drawdown events: a day whose low sits >= `min_drop_pct` below the peak
/// close of the preceding two days. Consecutive qualifying days collapse
/// into the first.
pub fn detect_drawdown_events(series: &[DailyClose], min_drop_pct: f64) -> Vec<NaiveDate> {
    let mut events = Vec::new();
    let mut in_event = false;
    for i in 2..series.len() {
        let peak = series[i - 2].close.max(series[i - 1].close);
        if peak <= 0.0 {
            continue;
        }
        let drop_pct = (peak - series[i].low) / peak * 100.0;
        if drop_pct >= min_drop_pct {
            if !in_event {
                events.push(series[i].date);
                in_event = true;
            }
        } else {
            in_event = false;
        }
    }
    events
}

pub fn compute_intervals(events: &[NaiveDate]) -> Vec<i64> {
    events
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect()
}

/// Does an interval land within tolerance of any multiple k*period, k<=5?
pub fn matches_period(interval: i64, period: i64, tolerance: i64) -> bool {
    (1..=5).any(|k| (interval - k * period).abs() <= tolerance)
}

/// Chi-squared goodness of fit vs a uniform-interval null: the probability
/// of hitting a +/-tolerance window at random is window/range.
pub fn chi_squared_analysis(
    intervals: &[i64],
    period: i64,
    tolerance: i64,
) -> (usize, f64, f64, f64) {
    if intervals.is_empty() {
        return (0, 0.0, 0.0, 1.0);
    }
    let matches = intervals
        .iter()
        .filter(|iv| matches_period(**iv, period, tolerance))
        .count();

    let min_iv = *intervals.iter().min().unwrap();
    let max_iv = *intervals.iter().max().unwrap();
    let range = (max_iv - min_iv + 1) as f64;
    let window = (2 * tolerance + 1) as f64;
    let expected = intervals.len() as f64 * (window / range).min(1.0);

    if expected <= 0.0 {
        return (matches, expected, 0.0, 1.0);
    }
    let chi2 = (matches as f64 - expected).powi(2) / expected;
    let p_value = match ChiSquared::new(1.0) {
        Ok(dist) => 1.0 - dist.cdf(chi2),
        Err(_) => 1.0,
    };
    (matches, expected, chi2, p_value)
}

fn enrich_event(date: NaiveDate) -> EventEnrichment {
    let state = ephemeris::daily_state(date);
    EventEnrichment {
        date,
        lunar_phase: state.lunar_phase_name.to_string(),
        mercury_retrograde: state.mercury_retrograde,
        retrograde_count: state.retrograde_count,
        universal_day_number: numerology::universal_day_number(date),
        is_master_number: numerology::is_master_number_date(date),
    }
}

pub fn cycle_report(
    series: &[DailyClose],
    period: i64,
    tolerance: i64,
    min_drop_pct: f64,
) -> CycleReport {
    let events = detect_drawdown_events(series, min_drop_pct);
    let intervals = compute_intervals(&events);
    let (matches, expected, chi2, p_value) = chi_squared_analysis(&intervals, period, tolerance);

    let mut distribution = BTreeMap::new();
    for iv in &intervals {
        *distribution.entry(*iv).or_insert(0) += 1;
    }

    CycleReport {
        event_count: events.len(),
        intervals: intervals.clone(),
        interval_distribution: distribution,
        matches,
        expected_matches: expected,
        match_rate: if intervals.is_empty() {
            0.0
        } else {
            matches as f64 / intervals.len() as f64
        },
        chi2,
        p_value,
        is_significant: p_value < 0.05 && matches as f64 > expected,
        enrichments: events.iter().map(|d| enrich_event(*d)).collect(),
        event_dates: events,
    }
}

/// Load the daily series and run the cycle report against the store.
pub async fn run_cycle_backtest(
    db: &DatabaseConnection,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    period: i64,
    tolerance: i64,
    min_drop_pct: f64,
) -> Result<CycleReport, DbErr> {
    let rows = Candles::find()
        .filter(candles::Column::Symbol.eq(symbol))
        .filter(candles::Column::Timeframe.eq(Timeframe::D1.as_str()))
        .filter(candles::Column::Timestamp.gte(start.and_hms_opt(0, 0, 0).unwrap().and_utc()))
        .filter(candles::Column::Timestamp.lte(end.and_hms_opt(23, 59, 59).unwrap().and_utc()))
        .order_by_asc(candles::Column::Timestamp)
        .all(db)
        .await?;

    let series: Vec<DailyClose> = rows
        .iter()
        .filter_map(|r| {
            Some(DailyClose {
                date: r.timestamp.date_naive(),
                close: r.close?.to_f64()?,
                low: r.low.and_then(|l| l.to_f64()).unwrap_or(r.close?.to_f64()?),
            })
        })
        .collect();

    Ok(cycle_report(&series, period, tolerance, min_drop_pct))
}

// ---------------------------------------------------------------------------
// Signal backtester
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickScore {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub ta: Option<f64>,
    pub onchain: Option<f64>,
    pub celestial: Option<f64>,
    pub numerology: Option<f64>,
    pub sentiment: Option<f64>,
    pub political: Option<f64>,
    pub macro_: Option<f64>,
    pub composite: f64,
}

impl TickScore {
    fn layer_scores(&self) -> LayerScores {
        LayerScores {
            ta: self.ta,
            onchain: self.onchain,
            celestial: self.celestial,
            numerology: self.numerology,
            sentiment: self.sentiment,
            political: self.political,
            macro_: self.macro_,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub ticks: usize,
    pub trades: Vec<Trade>,
    pub hit_rate: f64,
    pub mean_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_like: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightCandidate {
    pub weights: LayerWeights,
    pub objective: f64,
    pub hit_rate: f64,
    pub mean_return_pct: f64,
}

/// Trade rule: long when composite > +tau, flat when composite < -tau.
pub fn simulate_trades(ticks: &[TickScore], threshold: f64) -> SignalReport {
    let mut trades = Vec::new();
    let mut entry: Option<(DateTime<Utc>, f64)> = None;

    for tick in ticks {
        match entry {
            None if tick.composite > threshold && tick.close > 0.0 => {
                entry = Some((tick.timestamp, tick.close));
            }
            Some((entered_at, entry_price)) if tick.composite < -threshold => {
                let return_pct = (tick.close - entry_price) / entry_price * 100.0;
                trades.push(Trade {
                    entered_at,
                    exited_at: tick.timestamp,
                    entry_price,
                    exit_price: tick.close,
                    return_pct,
                });
                entry = None;
            }
            _ => {}
        }
    }
    // An open position at the end of the range closes on the final bar.
    if let (Some((entered_at, entry_price)), Some(last)) = (entry, ticks.last()) {
        if last.close > 0.0 && entry_price > 0.0 && last.timestamp > entered_at {
            trades.push(Trade {
                entered_at,
                exited_at: last.timestamp,
                entry_price,
                exit_price: last.close,
                return_pct: (last.close - entry_price) / entry_price * 100.0,
            });
        }
    }

    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    let hits = returns.iter().filter(|r| **r > 0.0).count();
    let mean = if returns.is_empty() {
        0.0
    } else {
        returns.iter().sum::<f64>() / returns.len() as f64
    };
    let std = if returns.len() > 1 {
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / (returns.len() as f64 - 1.0);
        var.sqrt()
    } else {
        0.0
    };

    // Equity-curve max drawdown over compounded trade returns.
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    for r in &returns {
        equity *= 1.0 + r / 100.0;
        peak = peak.max(equity);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak * 100.0);
        }
    }

    SignalReport {
        ticks: ticks.len(),
        hit_rate: if trades.is_empty() {
            0.0
        } else {
            hits as f64 / trades.len() as f64
        },
        mean_return_pct: mean,
        max_drawdown_pct: max_dd,
        sharpe_like: if std > 0.0 { mean / std } else { 0.0 },
        trades,
    }
}

/// Replay a range: at each tick, call every producer read-only with the
/// walker's instant, fuse with the given weights, and record the tick.
pub async fn replay_range(
    db: &DatabaseConnection,
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    weights: &LayerWeights,
) -> Result<Vec<TickScore>, DbErr> {
    let step = timeframe.duration();
    let mut ticks = Vec::new();
    let mut at = start;

    while at <= end {
        let close = bounded_store::newest_at_or_before(
            db,
            Candles::find()
                .filter(candles::Column::Symbol.eq(symbol))
                .filter(candles::Column::Timeframe.eq(timeframe.as_str())),
            candles::Column::Timestamp,
            at,
        )
        .await?
        .and_then(|r| r.close.and_then(|c| c.to_f64()));

        let Some(close) = close else {
            at += step;
            continue;
        };

        let date = at.date_naive();
        let outcome_score = |o: producers::ProduceOutcome| {
            if o.degraded {
                None
            } else {
                Some(clamp_score(o.score))
            }
        };

        let scores = LayerScores {
            ta: outcome_score(producers::produce_ta(db, symbol, timeframe, at, false).await?),
            onchain: outcome_score(producers::produce_onchain(db, symbol, at, false).await?),
            celestial: outcome_score(producers::produce_celestial(db, date, at, false).await?),
            numerology: outcome_score(producers::produce_numerology(db, date, at, false).await?),
            sentiment: outcome_score(producers::produce_sentiment(db, symbol, at, false).await?),
            political: outcome_score(producers::produce_political(db, at, false).await?),
            macro_: outcome_score(producers::produce_macro(db, at, false).await?),
        };

        let result = compute_composite(&scores, weights);
        ticks.push(TickScore {
            timestamp: at,
            close,
            ta: scores.ta,
            onchain: scores.onchain,
            celestial: scores.celestial,
            numerology: scores.numerology,
            sentiment: scores.sentiment,
            political: scores.political,
            macro_: scores.macro_,
            composite: result.composite,
        });

        at += step;
    }

    Ok(ticks)
}

/// Weight vectors on the simplex at the given granularity (e.g. 0.1).
pub fn weight_grid(granularity: f64) -> Vec<LayerWeights> {
    let steps = (1.0 / granularity).round() as i64;
    let mut grid = Vec::new();
    // Seven non-negative integers summing to `steps`.
    for ta in 0..=steps {
        for onchain in 0..=steps - ta {
            for celestial in 0..=steps - ta - onchain {
                for num in 0..=steps - ta - onchain - celestial {
                    for sent in 0..=steps - ta - onchain - celestial - num {
                        for pol in 0..=steps - ta - onchain - celestial - num - sent {
                            let mac = steps - ta - onchain - celestial - num - sent - pol;
                            let f = |v: i64| v as f64 * granularity;
                            grid.push(LayerWeights {
                                ta: f(ta),
                                onchain: f(onchain),
                                celestial: f(celestial),
                                numerology: f(num),
                                sentiment: f(sent),
                                political: f(pol),
                                macro_: f(mac),
                            });
                        }
                    }
                }
            }
        }
    }
    grid
}

/// Re-score recorded ticks under alternative weights and rank by objective
/// (mean return per trade). Returns the top-k candidates.
pub fn optimize_weights(
    ticks: &[TickScore],
    threshold: f64,
    granularity: f64,
    top_k: usize,
) -> Vec<WeightCandidate> {
    let mut candidates: Vec<WeightCandidate> = weight_grid(granularity)
        .into_iter()
        .map(|weights| {
            let rescored: Vec<TickScore> = ticks
                .iter()
                .map(|t| TickScore {
                    composite: compute_composite(&t.layer_scores(), &weights).composite,
                    ..*t
                })
                .collect();
            let report = simulate_trades(&rescored, threshold);
            WeightCandidate {
                weights,
                objective: report.mean_return_pct,
                hit_rate: report.hit_rate,
                mean_return_pct: report.mean_return_pct,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.objective
            .partial_cmp(&a.objective)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(top_k);
    candidates
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

pub async fn store_report(
    db: &DatabaseConnection,
    kind: &str,
    params: serde_json::Value,
    report: serde_json::Value,
) -> Result<i64, DbErr> {
    let row = backtest_results::ActiveModel {
        kind: Set(kind.to_string()),
        params: Set(params),
        report: Set(report),
        ..Default::default()
    };
    let inserted = row.insert(db).await?;
    tracing::info!(id = inserted.id, kind = kind, "Backtest report stored");
    Ok(inserted.id)
}

pub async fn load_report(
    db: &DatabaseConnection,
    id: i64,
) -> Result<Option<backtest_results::Model>, DbErr> {
    BacktestResults::find_by_id(id).one(db).await
}

pub fn signal_report_json(report: &SignalReport, weights: &LayerWeights) -> serde_json::Value {
    json!({
        "weights": weights,
        "report": report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn flat_series(start: NaiveDate, days: usize, price: f64) -> Vec<DailyClose> {
        (0..days)
            .map(|i| DailyClose {
                date: start + Duration::days(i as i64),
                close: price,
                low: price,
            })
            .collect()
    }

    #[test]
    fn test_drawdown_detection() {
        let mut series = flat_series(d(2024, 1, 1), 10, 100.0);
        // Day 5 crashes 12% below the prior peak.
        series[5].close = 88.0;
        series[5].low = 88.0;
        // Day 6 still below, same run: no second event.
        series[6].close = 89.0;
        series[6].low = 89.0;
        let events = detect_drawdown_events(&series, DEFAULT_DRAWDOWN_PCT);
        assert_eq!(events, vec![d(2024, 1, 6)]);
    }

    #[test]
    fn test_no_events_in_calm_series() {
        let series = flat_series(d(2024, 1, 1), 30, 100.0);
        assert!(detect_drawdown_events(&series, DEFAULT_DRAWDOWN_PCT).is_empty());
    }

    #[test]
    fn test_intervals_and_period_matching() {
        let events = vec![d(2025, 1, 1), d(2025, 2, 17), d(2025, 4, 6)];
        let intervals = compute_intervals(&events);
        assert_eq!(intervals, vec![47, 48]);
        assert!(matches_period(47, 47, 2));
        assert!(matches_period(48, 47, 2));
        assert!(!matches_period(50, 47, 2));
        assert!(matches_period(94, 47, 2), "second harmonic counts");
    }

    #[test]
    fn test_chi_squared_concentrated_intervals() {
        // Every interval sits on the 47-day mark: far more matches than a
        // uniform null expects.
        let intervals = vec![47i64, 46, 48, 47, 47, 93, 47, 12, 47, 33];
        let (matches, expected, chi2, p) = chi_squared_analysis(&intervals, 47, 2);
        assert_eq!(matches, 8, "93 sits within tolerance of the second harmonic");
        assert!(expected < matches as f64);
        assert!(chi2 > 3.84, "chi2 {chi2} should clear the 5% critical value");
        assert!(p < 0.05);
    }

    #[test]
    fn test_chi_squared_empty() {
        let (matches, _, chi2, p) = chi_squared_analysis(&[], 47, 2);
        assert_eq!(matches, 0);
        assert_eq!(chi2, 0.0);
        assert_eq!(p, 1.0);
    }

    fn tick(ts_hour: u32, composite: f64, close: f64) -> TickScore {
        TickScore {
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, ts_hour, 0, 0).unwrap(),
            close,
            ta: None,
            onchain: None,
            celestial: None,
            numerology: None,
            sentiment: None,
            political: None,
            macro_: None,
            composite,
        }
    }

    #[test]
    fn test_trade_simulation() {
        let ticks = vec![
            tick(0, 0.1, 100.0),
            tick(1, 0.6, 100.0),  // enter
            tick(2, 0.3, 105.0),  // hold
            tick(3, -0.6, 110.0), // exit +10%
            tick(4, 0.7, 110.0),  // enter
            tick(5, -0.7, 99.0),  // exit -10%
        ];
        let report = simulate_trades(&ticks, 0.5);
        assert_eq!(report.trades.len(), 2);
        assert!((report.trades[0].return_pct - 10.0).abs() < 1e-9);
        assert!((report.trades[1].return_pct + 10.0).abs() < 1e-9);
        assert!((report.hit_rate - 0.5).abs() < 1e-9);
        assert!(report.max_drawdown_pct > 9.0);
    }

    #[test]
    fn test_open_position_closes_at_range_end() {
        let ticks = vec![tick(0, 0.6, 100.0), tick(1, 0.4, 120.0)];
        let report = simulate_trades(&ticks, 0.5);
        assert_eq!(report.trades.len(), 1);
        assert!((report.trades[0].return_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_grid_sums_to_one() {
        let grid = weight_grid(0.25);
        assert!(!grid.is_empty());
        for w in &grid {
            assert!((w.sum() - 1.0).abs() < 1e-9);
        }
        // C(4+6, 6) compositions of 4 into 7 parts.
        assert_eq!(grid.len(), 210);
    }

    #[test]
    fn test_optimize_weights_prefers_predictive_layer() {
        // TA layer perfectly predicts the move; macro predicts nothing.
        let mut ticks = Vec::new();
        for (hour, ta, close) in [
            (0u32, 0.9, 100.0),
            (1, 0.9, 110.0),
            (2, -0.9, 121.0),
            (3, 0.9, 100.0),
            (4, -0.9, 115.0),
        ] {
            let mut t = tick(hour, 0.0, close);
            t.ta = Some(ta);
            t.macro_ = Some(-ta);
            ticks.push(t);
        }
        let top = optimize_weights(&ticks, 0.5, 0.5, 5);
        assert!(!top.is_empty());
        let best = &top[0];
        assert!(
            best.weights.ta > best.weights.macro_,
            "expected TA-heavy winner, got {:?}",
            best.weights
        );
    }
}
