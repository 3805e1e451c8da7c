//! Application configuration from environment variables. API-key-gated
//! integrations read as empty strings and disable their ingestors.

use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub exchange_base_url: String,
    pub fear_greed_base_url: String,
    pub cryptoquant_api_key: String,
    pub glassnode_api_key: String,
    pub newsapi_key: String,
    pub gnews_api_key: String,
    pub fred_api_key: String,
    pub worker_id: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3004".to_string()),
            exchange_base_url: env::var("EXCHANGE_BASE_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            fear_greed_base_url: env::var("FEAR_GREED_BASE_URL")
                .unwrap_or_else(|_| "https://api.alternative.me/fng/".to_string()),
            cryptoquant_api_key: env::var("CRYPTOQUANT_API_KEY").unwrap_or_default(),
            glassnode_api_key: env::var("GLASSNODE_API_KEY").unwrap_or_default(),
            newsapi_key: env::var("NEWSAPI_KEY").unwrap_or_default(),
            gnews_api_key: env::var("GNEWS_API_KEY").unwrap_or_default(),
            fred_api_key: env::var("FRED_API_KEY").unwrap_or_default(),
            worker_id: env::var("WORKER_ID").unwrap_or_else(|_| {
                format!("worker-{}", std::process::id())
            }),
        }
    }
}

/// Normalize a trading pair to the canonical `BASE/QUOTE` form.
/// Accepts `BTC-USDT`, `BTCUSDT`, `btc/usdt`, and bare `BTC`.
pub fn normalize_symbol(symbol: &str) -> String {
    let s = symbol.to_uppercase().replace('-', "/");
    if s.contains('/') {
        return s;
    }
    for quote in ["USDT", "USDC", "BUSD", "USD", "BTC", "ETH"] {
        if s.ends_with(quote) && s.len() > quote.len() {
            return format!("{}/{}", &s[..s.len() - quote.len()], quote);
        }
    }
    format!("{s}/USDT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("BTCUSDT"), "BTC/USDT");
        assert_eq!(normalize_symbol("btc-usdt"), "BTC/USDT");
        assert_eq!(normalize_symbol("BTC/USDT"), "BTC/USDT");
        assert_eq!(normalize_symbol("ETH"), "ETH/USDT");
        assert_eq!(normalize_symbol("SOLUSDC"), "SOL/USDC");
    }
}
