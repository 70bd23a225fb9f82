//! 定时清扫任务。

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::store::DocumentStore;
use crate::sweep::{SweepSettings, run_sweep};

/// 启动按固定周期运行的清扫任务，首次 tick 立即触发。
pub fn spawn_sweeper<S>(store: Arc<S>, settings: SweepSettings) -> JoinHandle<()>
where
    S: DocumentStore + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let result = run_sweep(store.as_ref(), &settings, Utc::now()).await;
            debug!(updated = result.updated, "sweep tick finished");
        }
    })
}
