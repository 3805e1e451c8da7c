pub use super::alert_cursors::Entity as AlertCursors;
pub use super::alerts::Entity as Alerts;
pub use super::backtest_results::Entity as BacktestResults;
pub use super::candles::Entity as Candles;
pub use super::celestial_state::Entity as CelestialState;
pub use super::confluence_scores::Entity as ConfluenceScores;
pub use super::custom_cycles::Entity as CustomCycles;
pub use super::job_leases::Entity as JobLeases;
pub use super::macro_series::Entity as MacroSeries;
pub use super::macro_signal::Entity as MacroSignal;
pub use super::numerology_daily::Entity as NumerologyDaily;
pub use super::onchain_metrics::Entity as OnchainMetrics;
pub use super::political_calendar::Entity as PoliticalCalendar;
pub use super::political_news::Entity as PoliticalNews;
pub use super::political_signal::Entity as PoliticalSignal;
pub use super::sentiment_data::Entity as SentimentData;
pub use super::signal_weights::Entity as SignalWeights;
pub use super::ta_indicators::Entity as TaIndicators;
pub use super::watched_symbols::Entity as WatchedSymbols;
