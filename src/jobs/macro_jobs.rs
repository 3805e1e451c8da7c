//! Macro layer jobs: series polling every 5 minutes, signal compute every
//! 15 minutes.

use chrono::Utc;
use std::time::Duration;

use crate::services::macro_fetch::{self, MacroService, TRACKED_SERIES};
use crate::services::producers;
use crate::services::scheduler::{JobSpec, Scheduler};

const POLL_CADENCE: Duration = Duration::from_secs(5 * 60);
const COMPUTE_CADENCE: Duration = Duration::from_secs(15 * 60);
const LEASE_TTL: Duration = Duration::from_secs(240);

/// Observations fetched per series per poll; enough to repair weekend gaps.
const POLL_DEPTH: u32 = 10;

pub fn start_macro_jobs(scheduler: &Scheduler, service: MacroService) {
    if service.is_available() {
        let spec = JobSpec::new("macro_series_poll", POLL_CADENCE, LEASE_TTL);
        scheduler.spawn(spec, move |db| {
            let service = service.clone();
            async move {
                for (key, series_id) in TRACKED_SERIES {
                    match service.fetch_series(series_id, POLL_DEPTH).await {
                        Ok(points) => {
                            let stored = macro_fetch::store_points(&db, key, &points).await?;
                            tracing::debug!(series = key, stored = stored, "Macro series updated");
                        }
                        Err(e) => {
                            tracing::error!(series = key, error = %e, "Macro series fetch failed");
                        }
                    }
                }
                Ok(())
            }
        });
    } else {
        tracing::warn!("FRED_API_KEY not set - macro series polling disabled");
    }

    let spec = JobSpec::new("macro_signal_compute", COMPUTE_CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| async move {
        let outcome = producers::produce_macro(&db, Utc::now(), true).await?;
        if outcome.degraded {
            tracing::warn!("Macro signal degraded - no series data yet");
        }
        Ok(())
    });
}
