//! One-shot historical candle backfill.
//!
//! Usage: backfill_candles <SYMBOL> <TIMEFRAME> [START_DATE]
//! e.g.   backfill_candles BTC/USDT 1h 2020-01-01

use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::Database;
use migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use confluence_backend::models::domain::Timeframe;
use confluence_backend::services::config::{normalize_symbol, AppConfig};
use confluence_backend::services::exchange::ExchangeService;
use confluence_backend::services::ingest;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <SYMBOL> <TIMEFRAME> [START_DATE]", args[0]);
        std::process::exit(2);
    }
    let symbol = normalize_symbol(&args[1]);
    let timeframe = Timeframe::parse(&args[2]).unwrap_or_else(|| {
        eprintln!("Unknown timeframe '{}'", args[2]);
        std::process::exit(2);
    });
    let start = args
        .get(3)
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| {
                eprintln!("Invalid start date '{s}'");
                std::process::exit(2);
            })
        })
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

    let config = AppConfig::from_env();
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let exchange = ExchangeService::new(config.exchange_base_url);
    let start = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap());

    match ingest::backfill(&db, &exchange, &symbol, timeframe, start).await {
        Ok(total) => tracing::info!(symbol = %symbol, timeframe = %timeframe, total = total, "Backfill finished"),
        Err(e) => {
            tracing::error!(error = %e, "Backfill failed");
            std::process::exit(1);
        }
    }
}
