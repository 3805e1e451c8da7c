//! On-chain metric fetchers, dual provider and key gated: flow metrics from
//! CryptoQuant, valuation metrics from Glassnode. With no keys configured the
//! layer stays dark and the confluence engine treats it as missing.

use chrono::Utc;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use std::time::Duration;

use crate::entities::{onchain_metrics, prelude::OnchainMetrics};
use crate::services::onchain_score::{compute_onchain_score, OnchainInputs};
use crate::services::retry::retry_with_backoff;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const CRYPTOQUANT_BASE: &str = "https://api.cryptoquant.com/v1";
const GLASSNODE_BASE: &str = "https://api.glassnode.com/v1/metrics";

fn cryptoquant_asset(symbol: &str) -> Option<&'static str> {
    match symbol {
        "BTC/USDT" => Some("btc"),
        "ETH/USDT" => Some("eth"),
        _ => None,
    }
}

fn glassnode_asset(symbol: &str) -> Option<&'static str> {
    match symbol {
        "BTC/USDT" => Some("BTC"),
        "ETH/USDT" => Some("ETH"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct OnchainService {
    client: Client,
    cryptoquant_api_key: String,
    glassnode_api_key: String,
}

impl OnchainService {
    pub fn new(cryptoquant_api_key: String, glassnode_api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        OnchainService {
            client,
            cryptoquant_api_key,
            glassnode_api_key,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.cryptoquant_api_key.is_empty() || !self.glassnode_api_key.is_empty()
    }

    async fn fetch_netflow(&self, symbol: &str) -> Option<f64> {
        if self.cryptoquant_api_key.is_empty() {
            return None;
        }
        let asset = cryptoquant_asset(symbol)?;
        let url = format!("{CRYPTOQUANT_BASE}/{asset}/exchange-flows/exchange-netflow-total");

        let body: Value = retry_with_backoff("cryptoquant_netflow", || async {
            self.client
                .get(&url)
                .bearer_auth(&self.cryptoquant_api_key)
                .query(&[("window", "day"), ("limit", "1")])
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        })
        .await
        .ok()?;

        body["result"]["data"]
            .as_array()?
            .last()?
            .get("netflow_total")?
            .as_f64()
    }

    async fn fetch_glassnode_metric(&self, symbol: &str, metric: &str) -> Option<f64> {
        if self.glassnode_api_key.is_empty() {
            return None;
        }
        let asset = glassnode_asset(symbol)?;
        let url = format!("{GLASSNODE_BASE}/{metric}");

        let body: Value = retry_with_backoff("glassnode", || async {
            self.client
                .get(&url)
                .query(&[
                    ("a", asset),
                    ("api_key", self.glassnode_api_key.as_str()),
                    ("i", "24h"),
                ])
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        })
        .await
        .ok()?;

        body.as_array()?.last()?.get("v")?.as_f64()
    }

    /// Pull all available metrics for a symbol.
    pub async fn fetch_metrics(&self, symbol: &str) -> OnchainInputs {
        OnchainInputs {
            exchange_netflow: self.fetch_netflow(symbol).await,
            nupl: self
                .fetch_glassnode_metric(symbol, "indicators/net_unrealized_profit_loss")
                .await,
            mvrv_z: self.fetch_glassnode_metric(symbol, "market/mvrv_z_score").await,
            sopr: self.fetch_glassnode_metric(symbol, "indicators/sopr").await,
        }
    }
}

fn dec(v: Option<f64>) -> Option<Decimal> {
    v.and_then(Decimal::from_f64)
}

/// Fetch, score, and upsert one on-chain row for the symbol. Returns the
/// score, or None when no provider returned anything.
pub async fn fetch_and_store(
    service: &OnchainService,
    db: &DatabaseConnection,
    symbol: &str,
) -> Result<Option<f64>, sea_orm::DbErr> {
    let inputs = service.fetch_metrics(symbol).await;
    let Some(score) = compute_onchain_score(&inputs) else {
        return Ok(None);
    };

    let row = onchain_metrics::ActiveModel {
        timestamp: Set(Utc::now()),
        symbol: Set(symbol.to_string()),
        exchange_netflow: Set(dec(inputs.exchange_netflow)),
        nupl: Set(dec(inputs.nupl)),
        mvrv_zscore: Set(dec(inputs.mvrv_z)),
        sopr: Set(dec(inputs.sopr)),
        whale_tx_count: Set(None),
        active_addresses: Set(None),
        score: Set(Decimal::from_f64(score)),
        degraded: Set(false),
    };
    OnchainMetrics::insert(row)
        .on_conflict(
            OnConflict::columns([
                onchain_metrics::Column::Timestamp,
                onchain_metrics::Column::Symbol,
            ])
            .update_columns([
                onchain_metrics::Column::ExchangeNetflow,
                onchain_metrics::Column::Nupl,
                onchain_metrics::Column::MvrvZscore,
                onchain_metrics::Column::Sopr,
                onchain_metrics::Column::Score,
                onchain_metrics::Column::Degraded,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;

    tracing::info!(symbol = symbol, score = score, "On-chain metrics stored");
    Ok(Some(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_maps() {
        assert_eq!(cryptoquant_asset("BTC/USDT"), Some("btc"));
        assert_eq!(glassnode_asset("ETH/USDT"), Some("ETH"));
        assert_eq!(cryptoquant_asset("DOGE/USDT"), None);
    }

    #[test]
    fn test_availability_gating() {
        let dark = OnchainService::new(String::new(), String::new());
        assert!(!dark.is_available());
        let lit = OnchainService::new("key".into(), String::new());
        assert!(lit.is_available());
    }
}
