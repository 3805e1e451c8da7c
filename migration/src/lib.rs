pub use sea_orm_migration::prelude::*;

mod m20260210_000001_create_watched_symbols;
mod m20260210_000002_create_candles;
mod m20260210_000003_create_ta_indicators;
mod m20260211_000001_create_onchain_sentiment;
mod m20260211_000002_create_esoteric_tables;
mod m20260212_000001_create_political_tables;
mod m20260212_000002_create_macro_tables;
mod m20260213_000001_create_confluence_tables;
mod m20260213_000002_create_alert_tables;
mod m20260214_000001_create_scheduler_backtest;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260210_000001_create_watched_symbols::Migration),
            Box::new(m20260210_000002_create_candles::Migration),
            Box::new(m20260210_000003_create_ta_indicators::Migration),
            Box::new(m20260211_000001_create_onchain_sentiment::Migration),
            Box::new(m20260211_000002_create_esoteric_tables::Migration),
            Box::new(m20260212_000001_create_political_tables::Migration),
            Box::new(m20260212_000002_create_macro_tables::Migration),
            Box::new(m20260213_000001_create_confluence_tables::Migration),
            Box::new(m20260213_000002_create_alert_tables::Migration),
            Box::new(m20260214_000001_create_scheduler_backtest::Migration),
        ]
    }
}
