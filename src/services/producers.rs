//! The uniform producer contract.
//!
//! Every layer exposes `produce(.., at)`: read raw inputs with timestamp at
//! or before `at`, compute the layer score deterministically, and (when
//! persisting) upsert one layer-score row. Producers never error out to the
//! scheduler — failures come back in the outcome record. The backtester
//! calls the same functions with `persist = false`, so no query here may
//! read past `at`.

use chrono::{DateTime, Duration, DurationRound, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::prelude::{
    Candles, ConfluenceScores, NumerologyDaily, OnchainMetrics, PoliticalNews, SentimentData,
    TaIndicators,
};
use crate::entities::{
    candles, confluence_scores, numerology_daily, onchain_metrics, political_news, sentiment_data,
    ta_indicators,
};
use crate::models::domain::Timeframe;
use crate::services::political_score::ArticleInput;
use crate::services::ta_compute::{self, Ohlcv, MIN_CANDLES};
use crate::services::{
    bounded_store, celestial, cycle_tracker, macro_fetch, macro_signal, numerology,
    onchain_score, political_calendar, political_score, sentiment_score,
};

/// Result record handed back to the scheduler. Producers log and report;
/// they do not throw.
#[derive(Debug, Clone, PartialEq)]
pub struct ProduceOutcome {
    pub wrote_row: bool,
    pub degraded: bool,
    pub score: f64,
    pub reason: Option<String>,
}

impl ProduceOutcome {
    fn ok(score: f64, wrote_row: bool) -> Self {
        ProduceOutcome {
            wrote_row,
            degraded: false,
            score,
            reason: None,
        }
    }

    fn degraded(reason: &str, wrote_row: bool) -> Self {
        ProduceOutcome {
            wrote_row,
            degraded: true,
            score: 0.0,
            reason: Some(reason.to_string()),
        }
    }
}

fn dec4(v: f64) -> Option<Decimal> {
    Decimal::from_f64((v * 10_000.0).round() / 10_000.0)
}

fn dec8(v: f64) -> Option<Decimal> {
    Decimal::from_f64(v)
}

fn floor_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::hours(1)).unwrap_or(at)
}

fn floor_quarter_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::minutes(15)).unwrap_or(at)
}

/// Sign of the mean composite over the 30 days before `at`; 0 when there is
/// no history. Feeds the trend-signed esoteric rules.
pub async fn prior_composite_trend(
    db: &DatabaseConnection,
    at: DateTime<Utc>,
) -> Result<f64, DbErr> {
    let rows = ConfluenceScores::find()
        .filter(confluence_scores::Column::Timestamp.lt(at))
        .filter(confluence_scores::Column::Timestamp.gte(at - Duration::days(30)))
        .all(db)
        .await?;

    let values: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.composite_score.and_then(|d| d.to_f64()))
        .collect();
    if values.is_empty() {
        return Ok(0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Ok(if mean == 0.0 { 0.0 } else { mean.signum() })
}

// ---------------------------------------------------------------------------
// TA
// ---------------------------------------------------------------------------

pub async fn produce_ta(
    db: &DatabaseConnection,
    symbol: &str,
    timeframe: Timeframe,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let rows = bounded_store::recent_at_or_before(
        db,
        Candles::find()
            .filter(candles::Column::Symbol.eq(symbol))
            .filter(candles::Column::Timeframe.eq(timeframe.as_str())),
        candles::Column::Timestamp,
        at,
        (MIN_CANDLES + 60) as u64,
    )
    .await?;

    let mut bars: Vec<Ohlcv> = rows
        .iter()
        .filter_map(|r| {
            Some(Ohlcv {
                timestamp: r.timestamp,
                open: r.open?.to_f64()?,
                high: r.high?.to_f64()?,
                low: r.low?.to_f64()?,
                close: r.close?.to_f64()?,
                volume: r.volume.and_then(|v| v.to_f64()).unwrap_or(0.0),
            })
        })
        .collect();
    bars.reverse();

    let newest = bars.last().map(|b| b.timestamp);
    let stale = newest.is_none_or(|ts| at.signed_duration_since(ts) > timeframe.duration() * 2);

    if bars.len() < MIN_CANDLES || stale {
        let reason = if stale { "stale_candles" } else { "insufficient_candles" };
        if persist {
            let row = ta_indicators::ActiveModel {
                timestamp: Set(at),
                symbol: Set(symbol.to_string()),
                timeframe: Set(timeframe.as_str().to_string()),
                score: Set(dec4(0.0)),
                degraded: Set(true),
                ..Default::default()
            };
            upsert_ta(db, row).await?;
        }
        tracing::warn!(symbol = symbol, timeframe = %timeframe, reason = reason, "TA degraded");
        return Ok(ProduceOutcome::degraded(reason, persist));
    }

    let Some(ind) = ta_compute::compute_indicators(&bars) else {
        return Ok(ProduceOutcome::degraded("insufficient_candles", false));
    };
    let (score, subs) = ta_compute::compute_ta_score(&ind);

    if persist {
        let row = ta_indicators::ActiveModel {
            timestamp: Set(newest.unwrap_or(at)),
            symbol: Set(symbol.to_string()),
            timeframe: Set(timeframe.as_str().to_string()),
            rsi_7: Set(ind.rsi_7.and_then(dec4)),
            rsi_14: Set(ind.rsi_14.and_then(dec4)),
            macd_line: Set(ind.macd_line.and_then(dec8)),
            macd_signal: Set(ind.macd_signal.and_then(dec8)),
            macd_histogram: Set(ind.macd_histogram.and_then(dec8)),
            stoch_k: Set(ind.stoch_k.and_then(dec4)),
            stoch_d: Set(ind.stoch_d.and_then(dec4)),
            sma_20: Set(ind.sma_20.and_then(dec8)),
            sma_50: Set(ind.sma_50.and_then(dec8)),
            sma_200: Set(ind.sma_200.and_then(dec8)),
            ema_12: Set(ind.ema_12.and_then(dec8)),
            ema_26: Set(ind.ema_26.and_then(dec8)),
            bb_upper: Set(ind.bb_upper.and_then(dec8)),
            bb_middle: Set(ind.bb_middle.and_then(dec8)),
            bb_lower: Set(ind.bb_lower.and_then(dec8)),
            atr_14: Set(ind.atr_14.and_then(dec8)),
            fib_levels: Set(ind.fib.and_then(|f| serde_json::to_value(f).ok())),
            sub_signals: Set(serde_json::to_value(&subs).ok()),
            score: Set(dec4(score)),
            degraded: Set(false),
        };
        upsert_ta(db, row).await?;
        tracing::info!(symbol = symbol, timeframe = %timeframe, score = score, "TA computed");
    }

    Ok(ProduceOutcome::ok(score, persist))
}

async fn upsert_ta(db: &DatabaseConnection, row: ta_indicators::ActiveModel) -> Result<(), DbErr> {
    TaIndicators::insert(row)
        .on_conflict(
            OnConflict::columns([
                ta_indicators::Column::Timestamp,
                ta_indicators::Column::Symbol,
                ta_indicators::Column::Timeframe,
            ])
            .update_columns([
                ta_indicators::Column::Rsi7,
                ta_indicators::Column::Rsi14,
                ta_indicators::Column::MacdLine,
                ta_indicators::Column::MacdSignal,
                ta_indicators::Column::MacdHistogram,
                ta_indicators::Column::StochK,
                ta_indicators::Column::StochD,
                ta_indicators::Column::Sma20,
                ta_indicators::Column::Sma50,
                ta_indicators::Column::Sma200,
                ta_indicators::Column::Ema12,
                ta_indicators::Column::Ema26,
                ta_indicators::Column::BbUpper,
                ta_indicators::Column::BbMiddle,
                ta_indicators::Column::BbLower,
                ta_indicators::Column::Atr14,
                ta_indicators::Column::FibLevels,
                ta_indicators::Column::SubSignals,
                ta_indicators::Column::Score,
                ta_indicators::Column::Degraded,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// On-chain / sentiment (recompute from the archived raw columns)
// ---------------------------------------------------------------------------

pub async fn produce_onchain(
    db: &DatabaseConnection,
    symbol: &str,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let row = bounded_store::newest_at_or_before(
        db,
        OnchainMetrics::find().filter(onchain_metrics::Column::Symbol.eq(symbol)),
        onchain_metrics::Column::Timestamp,
        at,
    )
    .await?;

    let Some(row) = row.filter(|r| at.signed_duration_since(r.timestamp) <= Duration::hours(24))
    else {
        return Ok(ProduceOutcome::degraded("no_fresh_metrics", false));
    };

    let inputs = onchain_score::OnchainInputs {
        exchange_netflow: row.exchange_netflow.and_then(|d| d.to_f64()),
        nupl: row.nupl.and_then(|d| d.to_f64()),
        mvrv_z: row.mvrv_zscore.and_then(|d| d.to_f64()),
        sopr: row.sopr.and_then(|d| d.to_f64()),
    };
    let Some(score) = onchain_score::compute_onchain_score(&inputs) else {
        return Ok(ProduceOutcome::degraded("no_metrics", false));
    };

    if persist {
        let mut model: onchain_metrics::ActiveModel = row.into();
        model.score = Set(dec4(score));
        model.degraded = Set(false);
        OnchainMetrics::insert(model)
            .on_conflict(
                OnConflict::columns([
                    onchain_metrics::Column::Timestamp,
                    onchain_metrics::Column::Symbol,
                ])
                .update_columns([
                    onchain_metrics::Column::Score,
                    onchain_metrics::Column::Degraded,
                ])
                .to_owned(),
            )
            .exec(db)
            .await?;
    }
    Ok(ProduceOutcome::ok(score, persist))
}

pub async fn produce_sentiment(
    db: &DatabaseConnection,
    symbol: &str,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let row = bounded_store::newest_at_or_before(
        db,
        SentimentData::find().filter(sentiment_data::Column::Symbol.eq(symbol)),
        sentiment_data::Column::Timestamp,
        at,
    )
    .await?;

    let Some(row) = row.filter(|r| at.signed_duration_since(r.timestamp) <= Duration::hours(24))
    else {
        return Ok(ProduceOutcome::degraded("no_fresh_reading", false));
    };
    let Some(index) = row.fear_greed_index else {
        return Ok(ProduceOutcome::degraded("no_reading", false));
    };

    let score = sentiment_score::compute_sentiment_score(
        index,
        row.social_score.and_then(|d| d.to_f64()),
        row.trends_score.and_then(|d| d.to_f64()),
    );

    if persist {
        let mut model: sentiment_data::ActiveModel = row.into();
        model.score = Set(dec4(score));
        model.degraded = Set(false);
        SentimentData::insert(model)
            .on_conflict(
                OnConflict::columns([
                    sentiment_data::Column::Timestamp,
                    sentiment_data::Column::Symbol,
                ])
                .update_columns([
                    sentiment_data::Column::Score,
                    sentiment_data::Column::Degraded,
                ])
                .to_owned(),
            )
            .exec(db)
            .await?;
    }
    Ok(ProduceOutcome::ok(score, persist))
}

// ---------------------------------------------------------------------------
// Celestial / numerology (date keyed, deterministic)
// ---------------------------------------------------------------------------

pub async fn produce_celestial(
    db: &DatabaseConnection,
    date: NaiveDate,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let trend = prior_composite_trend(db, at).await?;
    if persist {
        let score = celestial::compute_and_store(db, date, trend).await?;
        return Ok(ProduceOutcome::ok(score, true));
    }
    let state = crate::services::ephemeris::daily_state(date);
    let nearby = celestial::eclipse_within_days(date, celestial::ECLIPSE_WINDOW_DAYS);
    Ok(ProduceOutcome::ok(
        celestial::compute_celestial_score(&state, nearby, trend),
        false,
    ))
}

pub async fn produce_numerology(
    db: &DatabaseConnection,
    date: NaiveDate,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let alignments = cycle_tracker::alignments_for_date(db, date).await?;
    let trend = prior_composite_trend(db, at).await?;

    // Daily close for the watched reference market, bounded by `at`.
    let close_row = bounded_store::newest_at_or_before(
        db,
        Candles::find().filter(candles::Column::Timeframe.eq(Timeframe::D1.as_str())),
        candles::Column::Timestamp,
        at,
    )
    .await?;
    let daily_close = close_row.and_then(|r| r.close.and_then(|c| c.to_f64()));

    let result = numerology::compute_numerology(&numerology::NumerologyInputs {
        date,
        prior_trend: trend,
        alignments: alignments.clone(),
        daily_close,
        watched_numbers: numerology::DEFAULT_WATCHED_NUMBERS.to_vec(),
    });

    if persist {
        let row = numerology_daily::ActiveModel {
            date: Set(date),
            date_digit_sum: Set(Some(result.date_digit_sum as i32)),
            universal_day_number: Set(Some(result.universal_day_number as i32)),
            is_master_number: Set(result.is_master_number),
            master_number_value: Set(result.master_number_value.map(|v| v as i32)),
            active_cycles: Set(serde_json::to_value(&alignments).ok()),
            cycle_confluence_count: Set(result.cycle_confluence_count as i32),
            close_digit_match: Set(result.close_digit_match),
            score: Set(dec4(result.score)),
            degraded: Set(false),
        };
        NumerologyDaily::insert(row)
            .on_conflict(
                OnConflict::column(numerology_daily::Column::Date)
                    .update_columns([
                        numerology_daily::Column::DateDigitSum,
                        numerology_daily::Column::UniversalDayNumber,
                        numerology_daily::Column::IsMasterNumber,
                        numerology_daily::Column::MasterNumberValue,
                        numerology_daily::Column::ActiveCycles,
                        numerology_daily::Column::CycleConfluenceCount,
                        numerology_daily::Column::CloseDigitMatch,
                        numerology_daily::Column::Score,
                        numerology_daily::Column::Degraded,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;
        tracing::info!(date = %date, score = result.score, udn = result.universal_day_number, "Numerology computed");
    }

    Ok(ProduceOutcome::ok(result.score, persist))
}

// ---------------------------------------------------------------------------
// Political / macro
// ---------------------------------------------------------------------------

async fn load_articles(
    db: &DatabaseConnection,
    at: DateTime<Utc>,
) -> Result<Vec<ArticleInput>, DbErr> {
    let rows = bounded_store::window_ending_at(
        db,
        PoliticalNews::find(),
        political_news::Column::Timestamp,
        at - Duration::hours(72),
        at,
    )
    .await?;

    Ok(rows
        .iter()
        .map(|r| ArticleInput {
            timestamp: r.timestamp,
            category: r.category.clone().unwrap_or_else(|| "general".to_string()),
            subcategory: r.subcategory.clone(),
            relevance: r.crypto_relevance.and_then(|d| d.to_f64()).unwrap_or(0.0),
            sentiment: r.sentiment.and_then(|d| d.to_f64()).unwrap_or(0.0),
            urgency: r.urgency.and_then(|d| d.to_f64()).unwrap_or(0.0),
            mention_velocity: r.mention_velocity,
        })
        .collect())
}

pub async fn produce_political(
    db: &DatabaseConnection,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let calendar_rows = political_calendar::upcoming_events(db, at.date_naive(), 7).await?;
    let events = political_calendar::to_scorer_inputs(&calendar_rows);
    let articles = load_articles(db, at).await?;

    let result = political_score::compute_political_score(&events, &articles, at);

    if persist {
        let hour_ago = at - Duration::hours(1);
        let day_ago = at - Duration::hours(24);
        let volume_1h = articles.iter().filter(|a| a.timestamp >= hour_ago).count();
        let volume_24h = articles.iter().filter(|a| a.timestamp >= day_ago).count();
        let max_urgency_1h = articles
            .iter()
            .filter(|a| a.timestamp >= hour_ago)
            .map(|a| a.urgency)
            .fold(None::<f64>, |acc, u| Some(acc.map_or(u, |m| m.max(u))));

        let row = crate::entities::political_signal::ActiveModel {
            timestamp: Set(floor_hour(at)),
            calendar_score: Set(dec4(result.calendar_score)),
            news_score: Set(dec4(result.news_score)),
            narrative_score: Set(dec4(result.narrative_score)),
            high_vol_zone: Set(result.high_vol_zone),
            black_swan_override: Set(result.black_swan_override),
            news_volume_1h: Set(Some(volume_1h as i32)),
            news_volume_24h: Set(Some(volume_24h as i32)),
            max_urgency_1h: Set(max_urgency_1h.and_then(dec4)),
            dominant_narrative: Set(result.dominant_narrative.as_ref().map(|n| n.key.clone())),
            narrative_direction: Set(result.dominant_narrative.as_ref().map(|n| {
                if n.direction > 0.0 { "bullish" } else { "bearish" }.to_string()
            })),
            score: Set(dec4(result.score)),
            degraded: Set(false),
        };
        crate::entities::prelude::PoliticalSignal::insert(row)
            .on_conflict(
                OnConflict::column(crate::entities::political_signal::Column::Timestamp)
                    .update_columns([
                        crate::entities::political_signal::Column::CalendarScore,
                        crate::entities::political_signal::Column::NewsScore,
                        crate::entities::political_signal::Column::NarrativeScore,
                        crate::entities::political_signal::Column::HighVolZone,
                        crate::entities::political_signal::Column::BlackSwanOverride,
                        crate::entities::political_signal::Column::NewsVolume1h,
                        crate::entities::political_signal::Column::NewsVolume24h,
                        crate::entities::political_signal::Column::MaxUrgency1h,
                        crate::entities::political_signal::Column::DominantNarrative,
                        crate::entities::political_signal::Column::NarrativeDirection,
                        crate::entities::political_signal::Column::Score,
                        crate::entities::political_signal::Column::Degraded,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;
        tracing::info!(
            score = result.score,
            news_1h = volume_1h,
            black_swan = result.black_swan_override,
            "Political signal computed"
        );
    }

    Ok(ProduceOutcome::ok(result.score, persist))
}

pub async fn produce_macro(
    db: &DatabaseConnection,
    at: DateTime<Utc>,
    persist: bool,
) -> Result<ProduceOutcome, DbErr> {
    let snapshot = macro_fetch::load_snapshot(db, at).await?;
    let result = macro_signal::compute_macro_signal(&snapshot);

    let degraded = snapshot.m2.is_none() && snapshot.dxy.is_none() && snapshot.usdjpy.is_none();
    if persist {
        let row = crate::entities::macro_signal::ActiveModel {
            timestamp: Set(floor_quarter_hour(at)),
            liquidity_score: Set(dec4(result.liquidity_score)),
            treasury_score: Set(dec4(result.treasury_score)),
            dollar_score: Set(dec4(result.dollar_score)),
            oil_score: Set(dec4(result.oil_score)),
            carry_trade_score: Set(dec4(result.carry_trade_score)),
            carry_stress: Set(dec4(result.carry_stress)),
            regime: Set(Some(result.regime.clone())),
            regime_confidence: Set(dec4(result.regime_confidence)),
            sub_signals: Set(Some(result.sub_signals.clone())),
            score: Set(dec4(if degraded { 0.0 } else { result.score })),
            degraded: Set(degraded),
        };
        crate::entities::prelude::MacroSignal::insert(row)
            .on_conflict(
                OnConflict::column(crate::entities::macro_signal::Column::Timestamp)
                    .update_columns([
                        crate::entities::macro_signal::Column::LiquidityScore,
                        crate::entities::macro_signal::Column::TreasuryScore,
                        crate::entities::macro_signal::Column::DollarScore,
                        crate::entities::macro_signal::Column::OilScore,
                        crate::entities::macro_signal::Column::CarryTradeScore,
                        crate::entities::macro_signal::Column::CarryStress,
                        crate::entities::macro_signal::Column::Regime,
                        crate::entities::macro_signal::Column::RegimeConfidence,
                        crate::entities::macro_signal::Column::SubSignals,
                        crate::entities::macro_signal::Column::Score,
                        crate::entities::macro_signal::Column::Degraded,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;
        tracing::info!(score = result.score, regime = %result.regime, "Macro signal computed");
    }

    if degraded {
        return Ok(ProduceOutcome::degraded("no_series_data", persist));
    }
    Ok(ProduceOutcome::ok(result.score, persist))
}
