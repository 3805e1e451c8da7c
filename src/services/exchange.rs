//! Exchange REST client for OHLCV candles (Binance public API, no key).

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::domain::Timeframe;
use crate::services::retry::retry_with_backoff;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Max candles per klines request (Binance cap).
pub const PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCandle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Clone)]
pub struct ExchangeService {
    client: Client,
    base_url: String,
}

impl ExchangeService {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        ExchangeService { client, base_url }
    }

    /// `BTC/USDT` -> `BTCUSDT` as the exchange expects.
    fn exchange_symbol(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    /// Fetch up to `limit` klines, optionally starting at `since_ms`.
    pub async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since_ms: Option<i64>,
        limit: u32,
    ) -> Result<Vec<RawCandle>, reqwest::Error> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let pair = Self::exchange_symbol(symbol);
        let limit = limit.min(PAGE_SIZE).to_string();

        let mut params: Vec<(&str, String)> = vec![
            ("symbol", pair),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit),
        ];
        if let Some(since) = since_ms {
            params.push(("startTime", since.to_string()));
        }

        let rows: Vec<Value> = retry_with_backoff("exchange_klines", || async {
            self.client
                .get(&url)
                .query(&params)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<Value>>()
                .await
        })
        .await?;

        Ok(rows.iter().filter_map(parse_kline).collect())
    }
}

/// Klines rows are arrays: [openTime, open, high, low, close, volume, ...].
/// Numeric fields arrive as strings.
fn parse_kline(row: &Value) -> Option<RawCandle> {
    let arr = row.as_array()?;
    let num = |i: usize| -> Option<f64> {
        let v = arr.get(i)?;
        match v {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    };
    Some(RawCandle {
        timestamp_ms: arr.first()?.as_i64()?,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_row() {
        let row = json!([
            1700000000000i64,
            "37000.10",
            "37500.00",
            "36800.00",
            "37250.55",
            "1234.5678",
            1700003599999i64,
            "0",
            100,
            "0",
            "0",
            "0"
        ]);
        let candle = parse_kline(&row).unwrap();
        assert_eq!(candle.timestamp_ms, 1700000000000);
        assert!((candle.open - 37000.10).abs() < 1e-9);
        assert!((candle.close - 37250.55).abs() < 1e-9);
        assert!((candle.volume - 1234.5678).abs() < 1e-9);
    }

    #[test]
    fn test_parse_kline_rejects_malformed() {
        assert!(parse_kline(&json!("not an array")).is_none());
        assert!(parse_kline(&json!([1700000000000i64, "bad"])).is_none());
    }

    #[test]
    fn test_exchange_symbol() {
        assert_eq!(ExchangeService::exchange_symbol("BTC/USDT"), "BTCUSDT");
    }
}
