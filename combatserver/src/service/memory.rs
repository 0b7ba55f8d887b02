//! 인메모리 협력자 구현
//!
//! 단일 프로세스 실행과 테스트를 위한 DashMap 기반 구현입니다.
//! - `InMemoryStatsRepository`: 스탯 저장소
//! - `InMemoryWorld`: 장비, 상태 이상, 위치/스탯 스냅샷

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::attribute::{DerivedStats, Stats, StatsDiff};
use crate::traits::{
    EquipmentProvider, EquippedWeapon, SessionContext, StatsRepository, StatusProvider,
};
use crate::types::{ActorId, Position, WeaponSlot};
use shared::tool::error::AppError;

#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    stats: DashMap<ActorId, Stats>,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 쓰기 실패 주입 (장애 상황 재현용)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 성공/실패와 무관하게 시도된 upsert 횟수
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// 저장된 값을 동기로 조회
    pub fn get(&self, actor_id: &str) -> Option<Stats> {
        self.stats.get(actor_id).map(|s| s.clone())
    }

    pub fn contains(&self, actor_id: &str) -> bool {
        self.stats.contains_key(actor_id)
    }

    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.stats.iter().map(|e| e.key().clone()).collect()
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn fetch(&self, actor_id: &str) -> Result<Stats, AppError> {
        self.stats
            .get(actor_id)
            .map(|s| s.clone())
            .ok_or_else(|| AppError::ActorNotFound(actor_id.to_string()))
    }

    async fn upsert(&self, stats: &Stats) -> Result<(), AppError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(format!(
                "write rejected for {}",
                stats.actor_id
            )));
        }
        self.stats.insert(stats.actor_id.clone(), stats.clone());
        Ok(())
    }

    async fn delete(&self, actor_id: &str) -> Result<(), AppError> {
        self.stats
            .remove(actor_id)
            .map(|_| ())
            .ok_or_else(|| AppError::ActorNotFound(actor_id.to_string()))
    }
}

/// 장비/상태/세션 컨텍스트 인메모리 구현
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    weapons: DashMap<(ActorId, WeaponSlot), EquippedWeapon>,
    positions: DashMap<ActorId, Position>,
    derived: DashMap<ActorId, DerivedStats>,
    cannot_act: DashSet<ActorId>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equip(&self, actor_id: &str, slot: WeaponSlot, weapon: EquippedWeapon) {
        self.weapons.insert((actor_id.to_string(), slot), weapon);
    }

    pub fn unequip(&self, actor_id: &str, slot: WeaponSlot) {
        self.weapons.remove(&(actor_id.to_string(), slot));
    }

    pub fn set_position(&self, actor_id: &str, position: Position) {
        self.positions.insert(actor_id.to_string(), position);
    }

    /// 세션 컨텍스트의 파생 스탯 스냅샷 갱신
    pub fn set_derived_stats(&self, actor_id: &str, derived: DerivedStats) {
        self.derived.insert(actor_id.to_string(), derived);
    }

    /// 변경분만 스냅샷에 반영 (STATS_UPDATED 수신 시)
    pub fn merge_derived_stats(&self, actor_id: &str, diff: &StatsDiff) {
        let mut entry = self.derived.entry(actor_id.to_string()).or_default();
        for (stat, value) in diff {
            entry.insert(*stat, *value);
        }
    }

    /// 파생 스탯 스냅샷이 있는 액터 목록 (리젠 스윕 대상)
    pub fn known_actors(&self) -> Vec<ActorId> {
        self.derived.iter().map(|e| e.key().clone()).collect()
    }

    /// 제거된 액터의 월드 정보 정리
    pub fn forget(&self, actor_id: &str) {
        self.weapons.retain(|(owner, _), _| owner != actor_id);
        self.positions.remove(actor_id);
        self.derived.remove(actor_id);
        self.cannot_act.remove(actor_id);
    }

    pub fn set_can_act(&self, actor_id: &str, can_act: bool) {
        if can_act {
            self.cannot_act.remove(actor_id);
        } else {
            self.cannot_act.insert(actor_id.to_string());
        }
    }
}

#[async_trait]
impl EquipmentProvider for InMemoryWorld {
    async fn equipped_weapon(&self, actor_id: &str, slot: WeaponSlot) -> Option<EquippedWeapon> {
        self.weapons
            .get(&(actor_id.to_string(), slot))
            .map(|w| w.clone())
    }
}

#[async_trait]
impl StatusProvider for InMemoryWorld {
    async fn can_act(&self, actor_id: &str) -> bool {
        !self.cannot_act.contains(actor_id)
    }
}

#[async_trait]
impl SessionContext for InMemoryWorld {
    async fn position(&self, actor_id: &str) -> Option<Position> {
        self.positions.get(actor_id).map(|p| *p)
    }

    async fn derived_stats(&self, actor_id: &str) -> Option<DerivedStats> {
        self.derived.get(actor_id).map(|d| d.clone())
    }
}
