//! Candle ingestion: paginated historical backfill and latest-bar refresh,
//! upserted on the (timestamp, symbol, exchange, timeframe) primary key so
//! re-ingesting a window is a no-op.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};

use crate::entities::{candles, prelude::Candles};
use crate::models::domain::Timeframe;
use crate::services::exchange::{ExchangeService, RawCandle, PAGE_SIZE};

pub const DEFAULT_EXCHANGE: &str = "binance";

/// Pause between backfill pages, courteous to the public API.
const PAGE_SLEEP_MS: u64 = 1000;

#[derive(Debug)]
pub enum IngestError {
    Db(DbErr),
    Http(reqwest::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Db(e) => write!(f, "database error: {e}"),
            IngestError::Http(e) => write!(f, "exchange error: {e}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<DbErr> for IngestError {
    fn from(e: DbErr) -> Self {
        IngestError::Db(e)
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        IngestError::Http(e)
    }
}

fn dec(v: f64) -> Option<Decimal> {
    Decimal::from_f64(v)
}

/// Upsert a batch of raw candles. Returns the batch size.
pub async fn upsert_candles(
    db: &DatabaseConnection,
    raw: &[RawCandle],
    symbol: &str,
    exchange: &str,
    timeframe: Timeframe,
) -> Result<usize, DbErr> {
    if raw.is_empty() {
        return Ok(0);
    }

    let rows: Vec<candles::ActiveModel> = raw
        .iter()
        .map(|c| candles::ActiveModel {
            timestamp: Set(Utc
                .timestamp_millis_opt(c.timestamp_ms)
                .single()
                .unwrap_or_else(Utc::now)),
            symbol: Set(symbol.to_string()),
            exchange: Set(exchange.to_string()),
            timeframe: Set(timeframe.as_str().to_string()),
            open: Set(dec(c.open)),
            high: Set(dec(c.high)),
            low: Set(dec(c.low)),
            close: Set(dec(c.close)),
            volume: Set(dec(c.volume)),
        })
        .collect();

    let count = rows.len();
    Candles::insert_many(rows)
        .on_conflict(
            OnConflict::columns([
                candles::Column::Timestamp,
                candles::Column::Symbol,
                candles::Column::Exchange,
                candles::Column::Timeframe,
            ])
            .update_columns([
                candles::Column::Open,
                candles::Column::High,
                candles::Column::Low,
                candles::Column::Close,
                candles::Column::Volume,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(count)
}

/// Paginated historical backfill from `start`. Returns total candles written.
pub async fn backfill(
    db: &DatabaseConnection,
    exchange_api: &ExchangeService,
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
) -> Result<usize, IngestError> {
    let mut since_ms = start.timestamp_millis();
    let mut total = 0;

    tracing::info!(symbol = symbol, timeframe = %timeframe, start = %start, "Backfill starting");

    loop {
        let page = exchange_api
            .fetch_ohlcv(symbol, timeframe, Some(since_ms), PAGE_SIZE)
            .await?;
        if page.is_empty() {
            break;
        }

        total += upsert_candles(db, &page, symbol, DEFAULT_EXCHANGE, timeframe).await?;
        let last_ms = page.last().map(|c| c.timestamp_ms).unwrap_or(since_ms);

        tracing::info!(
            symbol = symbol,
            timeframe = %timeframe,
            page = page.len(),
            total = total,
            "Backfill page complete"
        );

        if page.len() < PAGE_SIZE as usize {
            break;
        }
        since_ms = last_ms + 1;
        tokio::time::sleep(std::time::Duration::from_millis(PAGE_SLEEP_MS)).await;
    }

    tracing::info!(symbol = symbol, timeframe = %timeframe, total = total, "Backfill complete");
    Ok(total)
}

/// Fetch the most recent candles (hourly refresh path).
pub async fn fetch_latest(
    db: &DatabaseConnection,
    exchange_api: &ExchangeService,
    symbol: &str,
    timeframe: Timeframe,
    limit: u32,
) -> Result<usize, IngestError> {
    let page = exchange_api.fetch_ohlcv(symbol, timeframe, None, limit).await?;
    Ok(upsert_candles(db, &page, symbol, DEFAULT_EXCHANGE, timeframe).await?)
}
