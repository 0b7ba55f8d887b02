//! 스탯 서비스
//!
//! 액터 초기화, 데미지/회복/리젠 적용, 저장소 왕복, diff 알림을 조율합니다.
//!
//! # 처리 규칙
//! - 한 액터에 대해 저장(persist)은 항상 알림(notify)보다 먼저 일어납니다
//! - 저장 실패는 로깅만 하며 인메모리 변경을 되돌리지 않습니다
//! - 알림은 fire-and-forget이며 재시도하지 않습니다
//! - `*_to` / 액터 ID를 받는 변경 경로는 액터별 비동기 뮤텍스로 직렬화됩니다.
//!   `&mut Stats`를 받는 스냅샷 경로는 잠금이 없으므로 오래된 복사본끼리
//!   경합하면 마지막 쓰기가 이깁니다

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::stats_types::{BaseStat, DamageMap, ItemEffects, StatsDiff};
use super::store::Stats;
use crate::combat::session::SessionRegistry;
use crate::messages::CombatEvent;
use crate::traits::{StatsRepository, StatusProvider, UpdateNotifier};
use crate::types::{ActorId, TemplateKind};
use shared::tool::error::AppError;

/// 잠금 경로 데미지 적용 결과
#[derive(Debug, Clone, PartialEq)]
pub struct DamageOutcome {
    pub stats: Stats,
    pub diff: StatsDiff,
    /// 이번 적용으로 HP가 0 초과에서 0 이하로 떨어졌는지 여부
    pub lethal: bool,
}

pub struct StatsService {
    repository: Arc<dyn StatsRepository>,
    notifier: Arc<dyn UpdateNotifier>,
    status: Arc<dyn StatusProvider>,
    sessions: Arc<SessionRegistry>,
    actor_locks: DashMap<ActorId, Arc<Mutex<()>>>,
}

impl StatsService {
    pub fn new(
        repository: Arc<dyn StatsRepository>,
        notifier: Arc<dyn UpdateNotifier>,
        status: Arc<dyn StatusProvider>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            repository,
            notifier,
            status,
            sessions,
            actor_locks: DashMap::new(),
        }
    }

    fn actor_lock(&self, actor_id: &str) -> Arc<Mutex<()>> {
        self.actor_locks
            .entry(actor_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 스폰 템플릿으로 액터 스탯 초기화
    ///
    /// 몹이면 새 전투 세션도 할당합니다.
    pub async fn initialize_actor(
        &self,
        actor_id: &str,
        kind: TemplateKind,
        level: i32,
    ) -> Result<Stats, AppError> {
        if level < 1 {
            return Err(AppError::Validation(format!(
                "level must be >= 1, got {level}"
            )));
        }

        let stats = Stats::from_template(actor_id, kind, level);

        if let Err(e) = self.repository.upsert(&stats).await {
            e.log("initialize_actor persist");
        }

        if kind == TemplateKind::Mob {
            self.sessions.allocate(actor_id);
        }

        info!(actor_id = %actor_id, kind = ?kind, level, "Actor stats initialized");
        Ok(stats)
    }

    pub async fn get_stats(&self, actor_id: &str) -> Result<Stats, AppError> {
        self.repository.fetch(actor_id).await
    }

    /// 스탯 삭제
    ///
    /// 진행 중인 잠금 경로 변경이 끝난 뒤에 삭제하므로, 늦게 도착한 쓰기가
    /// 삭제된 레코드를 되살리지 않습니다.
    pub async fn delete_stats(&self, actor_id: &str) -> Result<(), AppError> {
        let lock = self.actor_lock(actor_id);
        let _guard = lock.lock().await;

        let result = self.repository.delete(actor_id).await;
        self.actor_locks.remove(actor_id);
        result
    }

    /// 아이템 효과 전체 교체 후 재계산
    pub async fn apply_item_effects(
        &self,
        actor_id: &str,
        effects: ItemEffects,
    ) -> Result<StatsDiff, AppError> {
        let lock = self.actor_lock(actor_id);
        let _guard = lock.lock().await;

        let mut stats = self.repository.fetch(actor_id).await?;
        stats.item_effects = effects;
        let diff = stats.recalculate();
        self.handle_difference(&stats, &diff).await;
        Ok(diff)
    }

    /// 속성 포인트 분배
    ///
    /// 레벨은 분배할 수 없고, 음수나 보유량 초과 분배는 거부됩니다.
    pub async fn allocate_attribute_points(
        &self,
        actor_id: &str,
        allocation: BTreeMap<BaseStat, i32>,
    ) -> Result<StatsDiff, AppError> {
        if let Some(stat) = allocation.keys().find(|s| !s.is_allocatable()) {
            return Err(AppError::Validation(format!("{stat:?} is not allocatable")));
        }
        if allocation.values().any(|&points| points < 0) {
            return Err(AppError::Validation(
                "negative allocation is not allowed".to_string(),
            ));
        }

        let lock = self.actor_lock(actor_id);
        let _guard = lock.lock().await;

        let mut stats = self.repository.fetch(actor_id).await?;
        let requested: i32 = allocation.values().sum();
        if requested > stats.attribute_points {
            return Err(AppError::Validation(format!(
                "requested {requested} points but only {} available",
                stats.attribute_points
            )));
        }

        for (stat, points) in allocation {
            let current = stats.base(stat);
            stats.set_base(stat, current + points);
        }
        stats.attribute_points -= requested;

        let diff = stats.recalculate();
        // 파생 스탯이 그대로여도 포인트 소모는 저장되어야 합니다
        if diff.is_empty() && requested > 0 {
            self.persist(&stats).await;
        }
        self.handle_difference(&stats, &diff).await;
        Ok(diff)
    }

    /// 데미지 적용 (스냅샷 경로)
    ///
    /// 호출자가 가진 `Stats`를 직접 수정하고 한 번 저장/알림합니다.
    pub async fn apply_damage(&self, stats: &mut Stats, damage: &DamageMap) -> StatsDiff {
        let diff = stats.take_damage(damage);
        self.handle_difference(stats, &diff).await;
        diff
    }

    /// 데미지 적용 (잠금 경로)
    ///
    /// 최신 스탯을 읽어 적용하므로 동시 적용이 누적됩니다.
    /// 이미 죽은 액터에게는 적용하지 않습니다.
    pub async fn apply_damage_to(
        &self,
        actor_id: &str,
        damage: &DamageMap,
    ) -> Result<DamageOutcome, AppError> {
        let lock = self.actor_lock(actor_id);
        let _guard = lock.lock().await;

        let mut stats = self.repository.fetch(actor_id).await?;
        if !stats.is_alive() {
            return Ok(DamageOutcome {
                stats,
                diff: StatsDiff::new(),
                lethal: false,
            });
        }

        let diff = stats.take_damage(damage);
        self.handle_difference(&stats, &diff).await;

        let lethal = !stats.is_alive();
        if lethal {
            debug!(actor_id = %actor_id, "Lethal damage applied");
        }
        Ok(DamageOutcome {
            stats,
            diff,
            lethal,
        })
    }

    /// 회복 적용 (스냅샷 경로)
    pub async fn apply_heal(&self, stats: &mut Stats, amount: f64) -> StatsDiff {
        let diff = stats.heal(amount);
        self.handle_difference(stats, &diff).await;
        diff
    }

    /// 회복 적용 (잠금 경로)
    ///
    /// 죽은 액터는 되살리지 않습니다.
    pub async fn heal_actor(&self, actor_id: &str, amount: f64) -> Result<StatsDiff, AppError> {
        let lock = self.actor_lock(actor_id);
        let _guard = lock.lock().await;

        let mut stats = self.repository.fetch(actor_id).await?;
        if !stats.is_alive() {
            return Ok(StatsDiff::new());
        }
        Ok(self.apply_heal(&mut stats, amount).await)
    }

    /// 리젠 1틱 적용
    ///
    /// 행동 불가 상태이거나 이미 죽은 액터면 아무것도 하지 않습니다.
    pub async fn apply_regen_tick(&self, actor_id: &str) -> Result<StatsDiff, AppError> {
        if !self.status.can_act(actor_id).await {
            return Ok(StatsDiff::new());
        }

        let lock = self.actor_lock(actor_id);
        let _guard = lock.lock().await;

        let mut stats = self.repository.fetch(actor_id).await?;
        if !stats.is_alive() {
            return Ok(StatsDiff::new());
        }
        let diff = stats.regen();
        self.handle_difference(&stats, &diff).await;
        Ok(diff)
    }

    async fn persist(&self, stats: &Stats) {
        if let Err(e) = self.repository.upsert(stats).await {
            e.log(&format!("persist stats for {}", stats.actor_id));
        }
    }

    /// 변경이 있으면 저장 후 diff만 알림
    async fn handle_difference(&self, stats: &Stats, diff: &StatsDiff) {
        if diff.is_empty() {
            return;
        }

        self.persist(stats).await;

        let event = CombatEvent::StatsUpdated {
            actor_id: stats.actor_id.clone(),
            derived_stats: diff.clone(),
        };
        if let Err(e) = self.notifier.publish(event) {
            warn!(actor_id = %stats.actor_id, error = %e, "Stats update notification dropped");
        }
    }
}
