//! Store-backed pipeline tests: candle idempotence, the confluence ->
//! threshold-alert edge, cycle alignment alerts, and lease arbitration.
//! Each test skips cleanly when TEST_DATABASE_URL is not configured.

mod common;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use confluence_backend::entities::prelude::{
    AlertCursors, Alerts, Candles, CustomCycles, JobLeases,
};
use confluence_backend::entities::{
    alert_cursors, alerts, candles, celestial_state, confluence_scores, custom_cycles,
    macro_signal, numerology_daily, onchain_metrics, political_signal, sentiment_data,
    ta_indicators,
};
use confluence_backend::models::domain::Timeframe;
use confluence_backend::services::exchange::RawCandle;
use confluence_backend::services::scheduler::{release_lease, try_acquire_lease};
use confluence_backend::services::{alert_engine, confluence_engine, ingest};

fn dec(v: f64) -> Option<Decimal> {
    Decimal::from_f64(v)
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

async fn clean_symbol(db: &DatabaseConnection, symbol: &str) {
    Alerts::delete_many()
        .filter(alerts::Column::Symbol.eq(symbol))
        .exec(db)
        .await
        .unwrap();
    AlertCursors::delete_many()
        .filter(alert_cursors::Column::Symbol.eq(symbol))
        .exec(db)
        .await
        .unwrap();
    confluence_backend::entities::prelude::ConfluenceScores::delete_many()
        .filter(confluence_scores::Column::Symbol.eq(symbol))
        .exec(db)
        .await
        .unwrap();
    confluence_backend::entities::prelude::TaIndicators::delete_many()
        .filter(ta_indicators::Column::Symbol.eq(symbol))
        .exec(db)
        .await
        .unwrap();
}

/// Seed one full set of layer rows so the gather step sees every layer fresh
/// at `at`.
async fn seed_layer_rows(db: &DatabaseConnection, symbol: &str, at: DateTime<Utc>, ta: f64) {
    let row = ta_indicators::ActiveModel {
        timestamp: Set(at - Duration::minutes(5)),
        symbol: Set(symbol.to_string()),
        timeframe: Set(Timeframe::H1.as_str().to_string()),
        score: Set(dec(ta)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::TaIndicators::insert(row)
        .on_conflict(
            OnConflict::columns([
                ta_indicators::Column::Timestamp,
                ta_indicators::Column::Symbol,
                ta_indicators::Column::Timeframe,
            ])
            .update_columns([ta_indicators::Column::Score])
            .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();

    let row = onchain_metrics::ActiveModel {
        timestamp: Set(at - Duration::hours(1)),
        symbol: Set(symbol.to_string()),
        score: Set(dec(0.6)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::OnchainMetrics::insert(row)
        .on_conflict(
            OnConflict::columns([
                onchain_metrics::Column::Timestamp,
                onchain_metrics::Column::Symbol,
            ])
            .update_columns([onchain_metrics::Column::Score])
            .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();

    let row = sentiment_data::ActiveModel {
        timestamp: Set(at - Duration::hours(1)),
        symbol: Set(symbol.to_string()),
        fear_greed_index: Set(Some(35)),
        score: Set(dec(0.3)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::SentimentData::insert(row)
        .on_conflict(
            OnConflict::columns([
                sentiment_data::Column::Timestamp,
                sentiment_data::Column::Symbol,
            ])
            .update_columns([sentiment_data::Column::Score])
            .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();

    let row = celestial_state::ActiveModel {
        date: Set(at.date_naive()),
        score: Set(dec(0.5)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::CelestialState::insert(row)
        .on_conflict(
            OnConflict::column(celestial_state::Column::Date)
                .update_columns([celestial_state::Column::Score])
                .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();

    let row = numerology_daily::ActiveModel {
        date: Set(at.date_naive()),
        score: Set(dec(0.4)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::NumerologyDaily::insert(row)
        .on_conflict(
            OnConflict::column(numerology_daily::Column::Date)
                .update_columns([numerology_daily::Column::Score])
                .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();

    let row = political_signal::ActiveModel {
        timestamp: Set(at - Duration::minutes(30)),
        score: Set(dec(0.2)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::PoliticalSignal::insert(row)
        .on_conflict(
            OnConflict::column(political_signal::Column::Timestamp)
                .update_columns([political_signal::Column::Score])
                .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();

    let row = macro_signal::ActiveModel {
        timestamp: Set(at - Duration::minutes(10)),
        score: Set(dec(0.1)),
        degraded: Set(false),
        ..Default::default()
    };
    confluence_backend::entities::prelude::MacroSignal::insert(row)
        .on_conflict(
            OnConflict::column(macro_signal::Column::Timestamp)
                .update_columns([macro_signal::Column::Score])
                .to_owned(),
        )
        .exec(db)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_candle_ingest_is_idempotent() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let symbol = "INGEST-T/USDT";

    let batch: Vec<RawCandle> = (0..3)
        .map(|i| RawCandle {
            timestamp_ms: base_time().timestamp_millis() + i * 3_600_000,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 10.0,
        })
        .collect();

    ingest::upsert_candles(&db, &batch, symbol, "binance", Timeframe::H1)
        .await
        .unwrap();
    let first = Candles::find()
        .filter(candles::Column::Symbol.eq(symbol))
        .count(&db)
        .await
        .unwrap();

    // Second ingest of the same batch changes nothing.
    ingest::upsert_candles(&db, &batch, symbol, "binance", Timeframe::H1)
        .await
        .unwrap();
    let second = Candles::find()
        .filter(candles::Column::Symbol.eq(symbol))
        .count(&db)
        .await
        .unwrap();

    assert_eq!(first, 3);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_confluence_threshold_alert_fires_exactly_once() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let symbol = "THRESH-T/USDT";
    clean_symbol(&db, symbol).await;

    // Tick 1: composite lands at 0.472 with the default weights.
    let t1 = base_time();
    seed_layer_rows(&db, symbol, t1, 0.8).await;
    let outcome = confluence_engine::compute_and_store(&db, symbol, Timeframe::H1, t1)
        .await
        .unwrap();
    assert!((outcome.result.composite - 0.472).abs() < 1e-3);
    alert_engine::check_composite_alerts(&db, &outcome).await.unwrap();

    // No threshold alert yet: the first tick only establishes the cursor.
    let count = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Kind.eq("confluence_threshold"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 0);

    // Tick 2: TA rises and the composite crosses +0.5.
    let t2 = t1 + Duration::hours(1);
    seed_layer_rows(&db, symbol, t2, 0.95).await;
    let outcome = confluence_engine::compute_and_store(&db, symbol, Timeframe::H1, t2)
        .await
        .unwrap();
    assert!(outcome.result.composite >= 0.5);
    let created = alert_engine::check_composite_alerts(&db, &outcome).await.unwrap();
    assert!(created >= 1);

    let count = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Kind.eq("confluence_threshold"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // Re-running the same tick is a no-op: replayed writes are not the
    // leading edge.
    let outcome = confluence_engine::compute_and_store(&db, symbol, Timeframe::H1, t2)
        .await
        .unwrap();
    let created = alert_engine::check_composite_alerts(&db, &outcome).await.unwrap();
    assert_eq!(created, 0);

    let count = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Kind.eq("confluence_threshold"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1, "replay must not duplicate the alert");

    // Trigger context carries both composites.
    let alert = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Kind.eq("confluence_threshold"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.severity, "warning");
    let ctx = alert.trigger_context.unwrap();
    assert!(ctx.get("previous_composite").is_some());
    assert!(ctx.get("composite").is_some());
}

#[tokio::test]
async fn test_cycle_alignment_alert_once_per_occurrence() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let symbol = "CYCLE-T/USDT";
    clean_symbol(&db, symbol).await;
    CustomCycles::delete_many()
        .filter(custom_cycles::Column::Name.eq("test-47-day"))
        .exec(&db)
        .await
        .unwrap();

    let cycle = custom_cycles::ActiveModel {
        name: Set("test-47-day".to_string()),
        period_days: Set(47),
        anchor_date: Set(NaiveDate::from_ymd_opt(2025, 10, 10).unwrap()),
        tolerance_days: Set(2),
        direction: Set("bearish".to_string()),
        is_active: Set(true),
        hit_count: Set(0),
        miss_count: Set(0),
        ..Default::default()
    };
    cycle.insert(&db).await.unwrap();

    // Day 47 aligns; two sweeps in the same occurrence create one alert.
    let aligned_day = Utc.with_ymd_and_hms(2025, 11, 26, 9, 0, 0).unwrap();
    alert_engine::run_periodic_checks(&db, symbol, aligned_day).await.unwrap();
    alert_engine::run_periodic_checks(&db, symbol, aligned_day + Duration::hours(3))
        .await
        .unwrap();

    let count = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Kind.eq("cycle_alignment"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // Day 50 does not align: no new alert.
    let unaligned_day = Utc.with_ymd_and_hms(2025, 11, 29, 9, 0, 0).unwrap();
    alert_engine::run_periodic_checks(&db, symbol, unaligned_day).await.unwrap();
    let count = Alerts::find()
        .filter(alerts::Column::Symbol.eq(symbol))
        .filter(alerts::Column::Kind.eq("cycle_alignment"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_lease_single_firing() {
    let Some(db) = common::setup_test_db().await else {
        return;
    };
    let job = "test_lease_job";
    JobLeases::delete_many()
        .filter(confluence_backend::entities::job_leases::Column::JobName.eq(job))
        .exec(&db)
        .await
        .unwrap();

    let ttl = std::time::Duration::from_secs(60);
    assert!(try_acquire_lease(&db, job, "worker-a", ttl).await.unwrap());
    // A second worker cannot take a live lease.
    assert!(!try_acquire_lease(&db, job, "worker-b", ttl).await.unwrap());

    // Releasing frees it for the next owner.
    release_lease(&db, job, "worker-a").await.unwrap();
    assert!(try_acquire_lease(&db, job, "worker-b", ttl).await.unwrap());
    release_lease(&db, job, "worker-b").await.unwrap();
}
