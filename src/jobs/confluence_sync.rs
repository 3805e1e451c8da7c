//! Confluence compute job. Shares the hourly tick with the producers but
//! carries a short post-delay so their writes land first; the composite
//! write then drives the edge-triggered alert checks.

use chrono::Utc;
use std::time::Duration;

use crate::services::scheduler::{JobSpec, Scheduler};
use crate::services::{alert_engine, confluence_engine};

const CADENCE: Duration = Duration::from_secs(3600);
const LEASE_TTL: Duration = Duration::from_secs(600);

/// Sequenced after same-tick producers (bounded at 30s by design).
const POST_DELAY: Duration = Duration::from_secs(20);

pub fn start_confluence_job(scheduler: &Scheduler) {
    let spec = JobSpec::new("confluence_compute", CADENCE, LEASE_TTL).with_post_delay(POST_DELAY);
    scheduler.spawn(spec, move |db| async move {
        let universe = super::active_universe(&db).await?;
        let now = Utc::now();

        for (symbol, timeframes) in universe {
            for timeframe in timeframes {
                let outcome =
                    confluence_engine::compute_and_store(&db, &symbol, timeframe, now).await?;
                let alerts = alert_engine::check_composite_alerts(&db, &outcome).await?;
                if alerts > 0 {
                    tracing::info!(symbol = %symbol, timeframe = %timeframe, alerts = alerts, "Composite alerts fired");
                }
            }
        }
        Ok(())
    });
}
