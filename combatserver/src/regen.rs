//! 리젠 티커
//!
//! 외부 주기 스윕이 액터마다 호출합니다. 자체 액터 목록은 갖지 않으며,
//! HP/MP 리젠은 `StatsService`의 리젠 경로로 각각 독립 적용됩니다.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::attribute::{StatsDiff, StatsService};
use crate::types::ActorId;

pub struct RegenTicker {
    stats: Arc<StatsService>,
}

impl RegenTicker {
    pub fn new(stats: Arc<StatsService>) -> Self {
        Self { stats }
    }

    /// 한 액터에 리젠 1틱 적용
    ///
    /// 스탯이 없는 액터는 건너뜁니다.
    pub async fn tick_actor(&self, actor_id: &str) -> StatsDiff {
        match self.stats.apply_regen_tick(actor_id).await {
            Ok(diff) => diff,
            Err(e) => {
                e.log(&format!("regen tick for {actor_id}"));
                StatsDiff::new()
            }
        }
    }

    /// 스윕 1회. 값이 바뀐 액터 수를 반환
    pub async fn sweep(&self, actor_ids: &[ActorId]) -> usize {
        let mut changed = 0;
        for actor_id in actor_ids {
            if !self.tick_actor(actor_id).await.is_empty() {
                changed += 1;
            }
        }
        debug!(actors = actor_ids.len(), changed, "Regen sweep finished");
        changed
    }

    /// 주기적으로 스윕을 실행합니다
    ///
    /// `actors`는 매 스윕마다 호출되어 대상 액터 목록을 돌려줍니다.
    pub async fn run<F>(self, interval: Duration, cancel: CancellationToken, actors: F)
    where
        F: Fn() -> Vec<ActorId> + Send,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = interval.as_millis() as u64, "Regen sweep started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let ids = actors();
                    self.sweep(&ids).await;
                }
            }
        }

        info!("Regen sweep stopped");
    }
}
