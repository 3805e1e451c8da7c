use sea_orm::DatabaseConnection;

use crate::services::scheduler::HealthRegistry;
use crate::services::snapshot::SnapshotService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub snapshot: SnapshotService,
    pub health: HealthRegistry,
}

pub mod entities {
    pub mod prelude;

    pub mod alert_cursors;
    pub mod alerts;
    pub mod backtest_results;
    pub mod candles;
    pub mod celestial_state;
    pub mod confluence_scores;
    pub mod custom_cycles;
    pub mod job_leases;
    pub mod macro_series;
    pub mod macro_signal;
    pub mod numerology_daily;
    pub mod onchain_metrics;
    pub mod political_calendar;
    pub mod political_news;
    pub mod political_signal;
    pub mod sentiment_data;
    pub mod signal_weights;
    pub mod ta_indicators;
    pub mod watched_symbols;
}

pub mod services {
    pub mod alert_engine;
    pub mod backtester;
    pub mod bounded_store;
    pub mod celestial;
    pub mod config;
    pub mod confluence_engine;
    pub mod cycle_tracker;
    pub mod ephemeris;
    pub mod exchange;
    pub mod fear_greed;
    pub mod ingest;
    pub mod macro_fetch;
    pub mod macro_signal;
    pub mod news_classifier;
    pub mod news_fetch;
    pub mod numerology;
    pub mod onchain_fetch;
    pub mod onchain_score;
    pub mod political_calendar;
    pub mod political_score;
    pub mod producers;
    pub mod retry;
    pub mod scheduler;
    pub mod sentiment_score;
    pub mod snapshot;
    pub mod ta_compute;
}

pub mod handlers;
pub mod jobs;
pub mod models;
