//! Sentiment sync: every 4h, fetch the Fear & Greed index and store a scored
//! row per watched symbol.

use std::time::Duration;

use crate::services::fear_greed::{self, FearGreedService};
use crate::services::scheduler::{JobSpec, Scheduler};

const CADENCE: Duration = Duration::from_secs(4 * 3600);
const LEASE_TTL: Duration = Duration::from_secs(300);

pub fn start_sentiment_sync_job(scheduler: &Scheduler, service: FearGreedService) {
    let spec = JobSpec::new("sentiment_sync", CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| {
        let service = service.clone();
        async move {
            let reading = match service.fetch_current().await {
                Ok(Some(reading)) => reading,
                Ok(None) => {
                    tracing::warn!("Fear & Greed API returned no data");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Fear & Greed fetch failed");
                    return Ok(()); // transient; next tick retries
                }
            };

            let symbols: Vec<String> = super::active_universe(&db)
                .await?
                .into_iter()
                .map(|(s, _)| s)
                .collect();
            fear_greed::store_reading(&db, reading, &symbols).await?;
            Ok(())
        }
    });
}
