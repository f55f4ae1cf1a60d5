use crate::runner::MultiLedgerMonitor;
use crate::{MonitorError, Result};
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Run `monitor` immediately and then every `every` until `shutdown` resolves.
///
/// A failed run is logged and the loop continues, except when no wallets
/// are configured at all.
pub async fn run_periodically<S>(
    monitor: &mut MultiLedgerMonitor,
    every: Duration,
    shutdown: S,
) -> Result<usize>
where
    S: Future<Output = ()>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0usize;
    info!("🚀 Monitoring {:?} every {}s", monitor.networks(), every.as_secs());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("🛑 Shutdown requested after {} runs", runs);
                return Ok(runs);
            }
            _ = ticker.tick() => {
                runs += 1;
                match monitor.run_once(Utc::now().timestamp_millis()).await {
                    Ok(summary) => info!("Run {} persisted {} transactions", runs, summary.persisted),
                    Err(e @ MonitorError::NoWallets(_)) => return Err(e),
                    Err(e) => error!("❌ Run {} failed: {}", runs, e),
                }
            }
        }
    }
}
