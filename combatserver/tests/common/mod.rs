//! 통합 테스트 공용 하네스
//!
//! 인메모리 협력자로 스탯 서비스와 전투 엔진을 묶고, 발행된 이벤트를 기록합니다.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;

use combatserver::attribute::{DerivedStats, ItemEffects};
use combatserver::config::CombatConfig;
use combatserver::service::{InMemoryStatsRepository, InMemoryWorld};
use combatserver::traits::{EquippedWeapon, StatsRepository, UpdateNotifier};
use combatserver::{
    CombatEngine, CombatEvent, DerivedStat, Position, SessionRegistry, Stats, StatsService,
    WeaponSlot,
};
use shared::tool::error::AppError;

/// 발행된 이벤트와 발행 시점의 저장된 현재 HP를 기록하는 알림 채널
pub struct RecordingNotifier {
    repository: Arc<InMemoryStatsRepository>,
    events: Mutex<Vec<CombatEvent>>,
    stored_hp_at_publish: Mutex<Vec<Option<f64>>>,
}

impl RecordingNotifier {
    pub fn new(repository: Arc<InMemoryStatsRepository>) -> Self {
        Self {
            repository,
            events: Mutex::new(Vec::new()),
            stored_hp_at_publish: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<CombatEvent> {
        self.events.lock().clone()
    }

    pub fn stored_hp_at_publish(&self) -> Vec<Option<f64>> {
        self.stored_hp_at_publish.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
        self.stored_hp_at_publish.lock().clear();
    }

    pub fn swings(&self, actor_id: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, CombatEvent::SwingTelegraph { actor_id: a, .. } if a == actor_id))
            .count()
    }

    pub fn stats_updates(&self, actor_id: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, CombatEvent::StatsUpdated { actor_id: a, .. } if a == actor_id))
            .count()
    }

    pub fn removals(&self, actor_id: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| {
                matches!(e, CombatEvent::ActorsRemoved { actor_ids } if actor_ids.iter().any(|a| a == actor_id))
            })
            .count()
    }
}

impl UpdateNotifier for RecordingNotifier {
    fn publish(&self, event: CombatEvent) -> Result<(), AppError> {
        if let CombatEvent::StatsUpdated { actor_id, .. } = &event {
            let stored = self
                .repository
                .get(actor_id)
                .map(|s| s.derived(DerivedStat::CurrentHp));
            self.stored_hp_at_publish.lock().push(stored);
        }
        self.events.lock().push(event);
        Ok(())
    }
}

pub struct Harness {
    pub repository: Arc<InMemoryStatsRepository>,
    pub world: Arc<InMemoryWorld>,
    pub notifier: Arc<RecordingNotifier>,
    pub sessions: Arc<SessionRegistry>,
    pub stats: Arc<StatsService>,
    pub engine: Arc<CombatEngine>,
}

/// 분산 없음, 고정 시드, 기본 틱 100ms / 스윙 선행 100ms
pub fn test_config() -> CombatConfig {
    CombatConfig {
        damage_variance: 0.0,
        rng_seed: Some(7),
        ..CombatConfig::development()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: CombatConfig) -> Self {
        let repository = Arc::new(InMemoryStatsRepository::new());
        let world = Arc::new(InMemoryWorld::new());
        let notifier = Arc::new(RecordingNotifier::new(repository.clone()));
        let sessions = Arc::new(SessionRegistry::new());

        let stats = Arc::new(StatsService::new(
            repository.clone(),
            notifier.clone(),
            world.clone(),
            sessions.clone(),
        ));
        let engine = Arc::new(CombatEngine::new(
            config,
            sessions.clone(),
            stats.clone(),
            world.clone(),
            world.clone(),
            world.clone(),
            notifier.clone(),
        ));

        Self {
            repository,
            world,
            notifier,
            sessions,
            stats,
            engine,
        }
    }

    /// HP만 가진 액터를 저장소에 직접 넣습니다
    pub async fn put_actor(&self, actor_id: &str, hp: f64, max_hp: f64) -> Stats {
        let mut stats = Stats::new(actor_id);
        stats.set_derived(DerivedStat::CurrentHp, hp);
        stats.set_derived(DerivedStat::MaxHp, max_hp);
        self.repository.upsert(&stats).await.unwrap();
        stats
    }

    /// 공격자 준비: 저장된 스탯(없으면 HP 100), 위치, 배율 1.0 / 공격 속도 0
    /// 스냅샷, 주무기 장착
    pub async fn arm_attacker(&self, actor_id: &str, damage: f64, speed_secs: f64, range: f64) {
        if !self.repository.contains(actor_id) {
            self.put_actor(actor_id, 100.0, 100.0).await;
        }
        self.world.set_position(actor_id, Position::new(0.0, 0.0));
        self.world.set_derived_stats(
            actor_id,
            DerivedStats::from([
                (DerivedStat::PhysicalAmp, 1.0),
                (DerivedStat::AttackSpeed, 0.0),
            ]),
        );
        self.world.equip(
            actor_id,
            WeaponSlot::MainHand,
            EquippedWeapon {
                item_instance_id: format!("{actor_id}-sword"),
                attack_range: Some(range),
                item_effects: ItemEffects::from([
                    (DerivedStat::WeaponDamage, damage),
                    (DerivedStat::WeaponAttackSpeed, speed_secs),
                ]),
            },
        );
    }

    pub fn place(&self, actor_id: &str, x: f64, y: f64) {
        self.world.set_position(actor_id, Position::new(x, y));
    }

    pub fn stored_hp(&self, actor_id: &str) -> Option<f64> {
        self.repository
            .get(actor_id)
            .map(|s| s.derived(DerivedStat::CurrentHp))
    }
}
