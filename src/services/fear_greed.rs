//! Fear & Greed index client (alternative.me, free, no key) and the
//! sentiment ingest path.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use std::time::Duration;

use crate::entities::{prelude::SentimentData, sentiment_data};
use crate::services::retry::retry_with_backoff;
use crate::services::sentiment_score::{compute_sentiment_score, fear_greed_label};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FearGreedReading {
    pub value: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    timestamp: String,
}

#[derive(Clone)]
pub struct FearGreedService {
    client: Client,
    base_url: String,
}

impl FearGreedService {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        FearGreedService { client, base_url }
    }

    pub async fn fetch_current(&self) -> Result<Option<FearGreedReading>, reqwest::Error> {
        let url = format!("{}?limit=1&format=json", self.base_url.trim_end_matches('/'));
        let body: FngResponse = retry_with_backoff("fear_greed", || async {
            self.client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<FngResponse>()
                .await
        })
        .await?;

        Ok(body.data.first().and_then(parse_entry))
    }
}

fn parse_entry(entry: &FngEntry) -> Option<FearGreedReading> {
    let value: i32 = entry.value.parse().ok()?;
    let ts: i64 = entry.timestamp.parse().ok()?;
    Some(FearGreedReading {
        value,
        timestamp: Utc.timestamp_opt(ts, 0).single()?,
    })
}

/// Store the current reading for each watched symbol (the index is
/// market-wide; rows are per symbol for the confluence join).
pub async fn store_reading(
    db: &DatabaseConnection,
    reading: FearGreedReading,
    symbols: &[String],
) -> Result<usize, sea_orm::DbErr> {
    let score = compute_sentiment_score(reading.value, None, None);

    for symbol in symbols {
        let row = sentiment_data::ActiveModel {
            timestamp: Set(reading.timestamp),
            symbol: Set(symbol.clone()),
            fear_greed_index: Set(Some(reading.value)),
            fear_greed_label: Set(Some(fear_greed_label(reading.value).to_string())),
            social_score: Set(None),
            trends_score: Set(None),
            score: Set(Decimal::from_f64(score)),
            degraded: Set(false),
        };
        SentimentData::insert(row)
            .on_conflict(
                OnConflict::columns([
                    sentiment_data::Column::Timestamp,
                    sentiment_data::Column::Symbol,
                ])
                .update_columns([
                    sentiment_data::Column::FearGreedIndex,
                    sentiment_data::Column::FearGreedLabel,
                    sentiment_data::Column::Score,
                    sentiment_data::Column::Degraded,
                ])
                .to_owned(),
            )
            .exec(db)
            .await?;
    }

    tracing::info!(
        value = reading.value,
        label = fear_greed_label(reading.value),
        symbols = symbols.len(),
        "Sentiment stored"
    );
    Ok(symbols.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        let entry = FngEntry {
            value: "25".into(),
            timestamp: "1700000000".into(),
        };
        let reading = parse_entry(&entry).unwrap();
        assert_eq!(reading.value, 25);
        assert_eq!(reading.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn test_parse_entry_rejects_garbage() {
        let entry = FngEntry {
            value: "greedy".into(),
            timestamp: "1700000000".into(),
        };
        assert!(parse_entry(&entry).is_none());
    }
}
