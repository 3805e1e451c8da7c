//! On-chain metric sync: every 4h, pull provider metrics for each watched
//! symbol and store the scored row. Disabled with a warning when no provider
//! key is configured.

use std::time::Duration;

use crate::services::onchain_fetch::{self, OnchainService};
use crate::services::scheduler::{JobSpec, Scheduler};

const CADENCE: Duration = Duration::from_secs(4 * 3600);
const LEASE_TTL: Duration = Duration::from_secs(600);

pub fn start_onchain_sync_job(scheduler: &Scheduler, service: OnchainService) {
    if !service.is_available() {
        tracing::warn!(
            "No on-chain API keys configured (CRYPTOQUANT_API_KEY / GLASSNODE_API_KEY) - \
             on-chain sync disabled"
        );
        return;
    }

    let spec = JobSpec::new("onchain_sync", CADENCE, LEASE_TTL);
    scheduler.spawn(spec, move |db| {
        let service = service.clone();
        async move {
            let universe = super::active_universe(&db).await?;
            for (symbol, _) in universe {
                match onchain_fetch::fetch_and_store(&service, &db, &symbol).await? {
                    Some(score) => {
                        tracing::info!(symbol = %symbol, score = score, "On-chain sync complete")
                    }
                    None => tracing::warn!(symbol = %symbol, "On-chain providers returned nothing"),
                }
            }
            Ok(())
        }
    });
}
