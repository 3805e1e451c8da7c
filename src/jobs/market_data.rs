//! Candle sync + TA compute job: on each cadence tick, refresh the latest
//! candles for every watched (symbol, timeframe) and re-run the TA producer.

use chrono::Utc;
use std::time::Duration;

use crate::services::exchange::ExchangeService;
use crate::services::scheduler::{JobSpec, Scheduler};
use crate::services::{ingest, producers};

const CADENCE: Duration = Duration::from_secs(3600);
const LEASE_TTL: Duration = Duration::from_secs(600);
const LATEST_CANDLES: u32 = 5;

pub fn start_market_data_job(scheduler: &Scheduler, exchange: ExchangeService) {
    let spec = JobSpec::new("market_data_sync", CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| {
        let exchange = exchange.clone();
        async move {
            let universe = super::active_universe(&db).await?;
            for (symbol, timeframes) in universe {
                for timeframe in timeframes {
                    match ingest::fetch_latest(&db, &exchange, &symbol, timeframe, LATEST_CANDLES)
                        .await
                    {
                        Ok(count) => {
                            tracing::info!(symbol = %symbol, timeframe = %timeframe, count = count, "Candles refreshed");
                        }
                        Err(e) => {
                            tracing::error!(symbol = %symbol, timeframe = %timeframe, error = %e, "Candle refresh failed");
                            continue;
                        }
                    }

                    let outcome =
                        producers::produce_ta(&db, &symbol, timeframe, Utc::now(), true).await?;
                    if outcome.degraded {
                        tracing::warn!(
                            symbol = %symbol,
                            timeframe = %timeframe,
                            reason = outcome.reason.as_deref().unwrap_or(""),
                            "TA produced degraded row"
                        );
                    }
                }
            }
            Ok(())
        }
    });
}
