//! Confluence engine: fuses the seven layer scores into a weighted composite
//! per (symbol, timeframe) and persists it with the weights snapshotted.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entities::prelude::{
    CelestialState, ConfluenceScores, MacroSignal, NumerologyDaily, OnchainMetrics,
    PoliticalSignal, SentimentData, SignalWeights, TaIndicators,
};
use crate::entities::{
    celestial_state, confluence_scores, macro_signal, numerology_daily, onchain_metrics,
    political_signal, sentiment_data, signal_weights, ta_indicators,
};
use crate::models::domain::{clamp_score, Layer, LayerWeights, Strength, Timeframe};
use crate::services::bounded_store;

/// Alignment magnitude floor.
pub const ALIGNMENT_THRESHOLD: f64 = 0.2;

/// Maximum input age per layer before the score is treated as 0 and the
/// layer drops out of alignment.
pub fn staleness_window(layer: Layer, timeframe: Timeframe) -> Duration {
    match layer {
        Layer::Ta => timeframe.duration() * 2,
        Layer::Onchain | Layer::Sentiment => Duration::hours(24),
        Layer::Celestial | Layer::Numerology => Duration::hours(48),
        Layer::Political | Layer::Macro => Duration::hours(2),
    }
}

/// Per-layer scores after the staleness check: None means missing or stale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerScores {
    pub ta: Option<f64>,
    pub onchain: Option<f64>,
    pub celestial: Option<f64>,
    pub numerology: Option<f64>,
    pub sentiment: Option<f64>,
    pub political: Option<f64>,
    pub macro_: Option<f64>,
}

impl LayerScores {
    pub fn get(&self, layer: Layer) -> Option<f64> {
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

    pub fn set(&mut self, layer: Layer, value: Option<f64>) {
        match layer {
            Layer::Ta => self.ta = value,
            Layer::Onchain => self.onchain = value,
            Layer::Celestial => self.celestial = value,
            Layer::Numerology => self.numerology = value,
            Layer::Sentiment => self.sentiment = value,
            Layer::Political => self.political = value,
            Layer::Macro => self.macro_ = value,
        }
    }

    pub fn missing(&self) -> Vec<Layer> {
        Layer::ALL
            .iter()
            .copied()
            .filter(|l| self.get(*l).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub composite: f64,
    pub strength: Strength,
    pub direction: String,
    pub aligned_layers: Vec<Layer>,
    pub alignment_count: usize,
}

/// `composite = sum(w_i * s_i)` over present layers (absent layers score 0),
/// clamped. Aligned layers have |s| >= 0.2 and match the composite sign; a
/// neutral composite reports the larger same-sign set with no direction
/// asserted.
pub fn compute_composite(scores: &LayerScores, weights: &LayerWeights) -> CompositeResult {
    let mut composite = 0.0;
    for layer in Layer::ALL {
        if let Some(s) = scores.get(layer) {
            composite += weights.get(layer) * clamp_score(s);
        }
    }
    let composite = clamp_score(composite);
    let strength = Strength::from_composite(composite);

    let strong = |sign: f64| -> Vec<Layer> {
        Layer::ALL
            .iter()
            .copied()
            .filter(|l| {
                scores
                    .get(*l)
                    .is_some_and(|s| s.abs() >= ALIGNMENT_THRESHOLD && s.signum() == sign)
            })
            .collect()
    };

    let (aligned, direction) = if strength == Strength::Neutral {
        let bullish = strong(1.0);
        let bearish = strong(-1.0);
        if bullish.len() >= bearish.len() {
            (bullish, "neutral".to_string())
        } else {
            (bearish, "neutral".to_string())
        }
    } else if composite > 0.0 {
        (strong(1.0), "bullish".to_string())
    } else {
        (strong(-1.0), "bearish".to_string())
    };

    CompositeResult {
        composite,
        strength,
        direction,
        alignment_count: aligned.len(),
        aligned_layers: aligned,
    }
}

fn to_f64(d: Option<Decimal>) -> Option<f64> {
    d.and_then(|v| v.to_f64())
}

fn fresh(ts: DateTime<Utc>, at: DateTime<Utc>, window: Duration) -> bool {
    at.signed_duration_since(ts) <= window
}

/// Newest layer-score rows with timestamp <= `at`, staleness applied.
/// Returns the scores plus the list of layers rejected as stale.
pub async fn gather_layer_scores(
    db: &DatabaseConnection,
    symbol: &str,
    timeframe: Timeframe,
    at: DateTime<Utc>,
) -> Result<(LayerScores, Vec<Layer>), DbErr> {
    let mut scores = LayerScores::default();
    let mut stale = Vec::new();
    let mut keep = |layer: Layer, ts: DateTime<Utc>, score: Option<f64>| {
        if fresh(ts, at, staleness_window(layer, timeframe)) {
            scores.set(layer, score);
        } else if score.is_some() {
            stale.push(layer);
        }
    };

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        TaIndicators::find()
            .filter(ta_indicators::Column::Symbol.eq(symbol))
            .filter(ta_indicators::Column::Timeframe.eq(timeframe.as_str())),
        ta_indicators::Column::Timestamp,
        at,
    )
    .await?
    {
        keep(Layer::Ta, row.timestamp, to_f64(row.score));
    }

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        OnchainMetrics::find().filter(onchain_metrics::Column::Symbol.eq(symbol)),
        onchain_metrics::Column::Timestamp,
        at,
    )
    .await?
    {
        keep(Layer::Onchain, row.timestamp, to_f64(row.score));
    }

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        SentimentData::find().filter(sentiment_data::Column::Symbol.eq(symbol)),
        sentiment_data::Column::Timestamp,
        at,
    )
    .await?
    {
        keep(Layer::Sentiment, row.timestamp, to_f64(row.score));
    }

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        CelestialState::find(),
        celestial_state::Column::Date,
        at.date_naive(),
    )
    .await?
    {
        let ts = row.date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        keep(Layer::Celestial, ts, to_f64(row.score));
    }

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        NumerologyDaily::find(),
        numerology_daily::Column::Date,
        at.date_naive(),
    )
    .await?
    {
        let ts = row.date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        keep(Layer::Numerology, ts, to_f64(row.score));
    }

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        PoliticalSignal::find(),
        political_signal::Column::Timestamp,
        at,
    )
    .await?
    {
        keep(Layer::Political, row.timestamp, to_f64(row.score));
    }

    if let Some(row) = bounded_store::newest_at_or_before(
        db,
        MacroSignal::find(),
        macro_signal::Column::Timestamp,
        at,
    )
    .await?
    {
        keep(Layer::Macro, row.timestamp, to_f64(row.score));
    }

    // A degraded producer writes score 0; treat it like the score it wrote
    // but it will fall out of alignment on the magnitude floor anyway.
    Ok((scores, stale))
}

/// Active weight profile, falling back to the built-in defaults.
pub async fn get_active_weights(db: &DatabaseConnection) -> Result<LayerWeights, DbErr> {
    let row = SignalWeights::find()
        .filter(signal_weights::Column::IsActive.eq(true))
        .order_by_desc(signal_weights::Column::Id)
        .one(db)
        .await?;

    Ok(match row {
        Some(r) => LayerWeights {
            ta: r.ta_weight.to_f64().unwrap_or(0.0),
            onchain: r.onchain_weight.to_f64().unwrap_or(0.0),
            celestial: r.celestial_weight.to_f64().unwrap_or(0.0),
            numerology: r.numerology_weight.to_f64().unwrap_or(0.0),
            sentiment: r.sentiment_weight.to_f64().unwrap_or(0.0),
            political: r.political_weight.to_f64().unwrap_or(0.0),
            macro_: r.macro_weight.to_f64().unwrap_or(0.0),
        },
        None => LayerWeights::default(),
    })
}

fn dec4(v: f64) -> Option<Decimal> {
    Decimal::from_f64((v * 10_000.0).round() / 10_000.0)
}

/// The stored composite row plus the computed breakdown, as returned to
/// callers (the confluence job hands this to the alert engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceOutcome {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub scores: Vec<(Layer, Option<f64>)>,
    pub stale_layers: Vec<Layer>,
    pub weights: LayerWeights,
    pub result: CompositeResult,
}

/// Gather, compose, and upsert one composite row at `at`.
pub async fn compute_and_store(
    db: &DatabaseConnection,
    symbol: &str,
    timeframe: Timeframe,
    at: DateTime<Utc>,
) -> Result<ConfluenceOutcome, DbErr> {
    let weights = get_active_weights(db).await?;
    let (scores, stale) = gather_layer_scores(db, symbol, timeframe, at).await?;
    let result = compute_composite(&scores, &weights);

    let aligned_json = json!({
        "direction": result.direction,
        "layers": result.aligned_layers.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
    });
    let stale_json = json!(stale.iter().map(|l| l.as_str()).collect::<Vec<_>>());

    let row = confluence_scores::ActiveModel {
        timestamp: Set(at),
        symbol: Set(symbol.to_string()),
        timeframe: Set(timeframe.as_str().to_string()),
        ta_score: Set(scores.ta.and_then(dec4)),
        onchain_score: Set(scores.onchain.and_then(dec4)),
        celestial_score: Set(scores.celestial.and_then(dec4)),
        numerology_score: Set(scores.numerology.and_then(dec4)),
        sentiment_score: Set(scores.sentiment.and_then(dec4)),
        political_score: Set(scores.political.and_then(dec4)),
        macro_score: Set(scores.macro_.and_then(dec4)),
        weights: Set(serde_json::to_value(weights).unwrap_or_default()),
        composite_score: Set(dec4(result.composite)),
        signal_strength: Set(Some(result.strength.as_str().to_string())),
        aligned_layers: Set(Some(aligned_json)),
        alignment_count: Set(Some(result.alignment_count as i32)),
        stale_layers: Set(Some(stale_json)),
    };

    ConfluenceScores::insert(row)
        .on_conflict(
            OnConflict::columns([
                confluence_scores::Column::Timestamp,
                confluence_scores::Column::Symbol,
                confluence_scores::Column::Timeframe,
            ])
            .update_columns([
                confluence_scores::Column::TaScore,
                confluence_scores::Column::OnchainScore,
                confluence_scores::Column::CelestialScore,
                confluence_scores::Column::NumerologyScore,
                confluence_scores::Column::SentimentScore,
                confluence_scores::Column::PoliticalScore,
                confluence_scores::Column::MacroScore,
                confluence_scores::Column::Weights,
                confluence_scores::Column::CompositeScore,
                confluence_scores::Column::SignalStrength,
                confluence_scores::Column::AlignedLayers,
                confluence_scores::Column::AlignmentCount,
                confluence_scores::Column::StaleLayers,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;

    tracing::info!(
        symbol = symbol,
        timeframe = %timeframe,
        composite = result.composite,
        strength = result.strength.as_str(),
        aligned = result.alignment_count,
        "Confluence computed"
    );

    Ok(ConfluenceOutcome {
        symbol: symbol.to_string(),
        timeframe,
        timestamp: at,
        scores: Layer::ALL.iter().map(|l| (*l, scores.get(*l))).collect(),
        stale_layers: stale,
        weights,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scores() -> LayerScores {
        LayerScores {
            ta: Some(0.8),
            onchain: Some(0.6),
            celestial: Some(0.5),
            numerology: Some(0.4),
            sentiment: Some(0.3),
            political: Some(0.2),
            macro_: Some(0.1),
        }
    }

    #[test]
    fn test_weighted_composite() {
        let result = compute_composite(&sample_scores(), &LayerWeights::default());
        // 0.22*0.8 + 0.18*0.6 + 0.14*0.5 + 0.10*0.4 + 0.14*0.3 + 0.14*0.2 + 0.08*0.1
        assert!((result.composite - 0.472).abs() < 1e-9);
        assert_eq!(result.strength, Strength::Buy);
        assert_eq!(result.direction, "bullish");
        // Aligned: all layers with score >= 0.2 and positive sign (six of seven).
        assert_eq!(result.alignment_count, 6);
        assert!(!result.aligned_layers.contains(&Layer::Macro));
    }

    #[test]
    fn test_missing_layer_scores_zero_and_drops_from_alignment() {
        let mut scores = sample_scores();
        scores.onchain = None;
        let result = compute_composite(&scores, &LayerWeights::default());
        assert!((result.composite - (0.472 - 0.18 * 0.6)).abs() < 1e-9);
        assert!(!result.aligned_layers.contains(&Layer::Onchain));
        assert_eq!(result.alignment_count, 5);
    }

    #[test]
    fn test_clamping_on_out_of_range_input() {
        let mut scores = sample_scores();
        scores.ta = Some(3.0); // injected out-of-range sub-signal
        let result = compute_composite(&scores, &LayerWeights::default());
        assert!(result.composite <= 1.0);
    }

    #[test]
    fn test_neutral_composite_alignment_no_direction() {
        let scores = LayerScores {
            ta: Some(0.3),
            onchain: Some(0.25),
            celestial: Some(-0.3),
            numerology: Some(-0.25),
            sentiment: Some(-0.21),
            political: Some(0.05),
            macro_: Some(0.0),
        };
        let result = compute_composite(&scores, &LayerWeights::default());
        assert_eq!(result.strength, Strength::Neutral);
        assert_eq!(result.direction, "neutral");
        // Bearish side has three layers over the floor, bullish two.
        assert_eq!(result.alignment_count, 3);
    }

    #[test]
    fn test_strong_sell_band() {
        let scores = LayerScores {
            ta: Some(-0.9),
            onchain: Some(-0.8),
            celestial: Some(-0.7),
            numerology: Some(-0.6),
            sentiment: Some(-0.8),
            political: Some(-0.9),
            macro_: Some(-0.5),
        };
        let result = compute_composite(&scores, &LayerWeights::default());
        assert_eq!(result.strength, Strength::StrongSell);
        assert_eq!(result.alignment_count, 7);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let scores = sample_scores();
        let w = LayerWeights::default();
        assert_eq!(compute_composite(&scores, &w), compute_composite(&scores, &w));
    }

    #[test]
    fn test_staleness_windows() {
        assert_eq!(
            staleness_window(Layer::Ta, Timeframe::H1),
            Duration::hours(2)
        );
        assert_eq!(
            staleness_window(Layer::Ta, Timeframe::H4),
            Duration::hours(8)
        );
        assert_eq!(
            staleness_window(Layer::Onchain, Timeframe::H1),
            Duration::hours(24)
        );
        assert_eq!(
            staleness_window(Layer::Political, Timeframe::D1),
            Duration::hours(2)
        );
        assert_eq!(
            staleness_window(Layer::Celestial, Timeframe::H1),
            Duration::hours(48)
        );
    }
}
