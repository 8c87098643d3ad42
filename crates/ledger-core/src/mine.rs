use crate::chain::ChainStore;
use crate::ledger::{Ledger, MineOutcome};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Drives `Ledger::mine` on a fixed interval. The first cycle runs one
/// period after start. Failures are logged and retried on the next tick.
pub fn spawn_miner<S: ChainStore>(ledger: Ledger<S>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Miner started, interval {:?}", period);
        loop {
            ticker.tick().await;
            match ledger.mine().await {
                Ok(MineOutcome::Idle) => debug!("Nothing to mine"),
                Ok(MineOutcome::Stale) => info!("Mining raced an inbound block, retrying next cycle"),
                Ok(MineOutcome::Mined(_)) => {}
                Err(e) => error!("Mining cycle failed: {}", e),
            }
        }
    })
}
