//! 전투 세션 데이터
//!
//! 교전 중인 액터별 임시 전투 상태(타겟, 무기 슬롯별 마지막 공격 시각,
//! 스윙 전송 여부, 전투 상태)를 관리합니다. 레지스트리는 `CombatEngine`이
//! 소유하며, 몹 스폰 시 `StatsService`가 세션을 미리 할당합니다.
//! 교전이 끝나면(중지 요청, 타겟 소진, 사망) 세션은 제거됩니다.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::time::Instant;
use tracing::debug;

use crate::types::{ActorId, WeaponSlot};

/// 전투 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombatState {
    #[default]
    Idle,
    Engaged,
    Channeling,
}

/// 액터 한 명의 전투 세션
#[derive(Debug, Clone, Default)]
pub struct CombatSessionData {
    pub actor_id: ActorId,
    pub targets: BTreeSet<ActorId>,
    pub last_attack: HashMap<WeaponSlot, Instant>,
    pub swing_sent: HashMap<WeaponSlot, bool>,
    pub state: CombatState,
    /// 진행 중인 채널링 시작 시각
    pub channel_started_at: Option<Instant>,
}

impl CombatSessionData {
    pub fn new(actor_id: impl Into<ActorId>) -> Self {
        Self {
            actor_id: actor_id.into(),
            ..Default::default()
        }
    }

    pub fn last_attack(&self, slot: WeaponSlot) -> Option<Instant> {
        self.last_attack.get(&slot).copied()
    }

    pub fn swing_sent(&self, slot: WeaponSlot) -> bool {
        self.swing_sent.get(&slot).copied().unwrap_or(false)
    }
}

/// 액터 ID → 전투 세션 레지스트리
///
/// 여러 공격 루프가 동시에 접근하므로 DashMap을 사용합니다.
/// 가드를 `.await` 너머로 들고 있지 않도록 모든 접근은 클로저 단위로 끝납니다.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ActorId, CombatSessionData>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 세션 할당 (기존 세션은 교체)
    pub fn allocate(&self, actor_id: &str) {
        debug!(actor_id = %actor_id, "Allocating combat session");
        self.sessions
            .insert(actor_id.to_string(), CombatSessionData::new(actor_id));
    }

    pub fn contains(&self, actor_id: &str) -> bool {
        self.sessions.contains_key(actor_id)
    }

    pub fn remove(&self, actor_id: &str) -> Option<CombatSessionData> {
        self.sessions.remove(actor_id).map(|(_, session)| session)
    }

    /// 세션 스냅샷 복사본
    pub fn snapshot(&self, actor_id: &str) -> Option<CombatSessionData> {
        self.sessions.get(actor_id).map(|s| s.clone())
    }

    /// 세션이 있으면 수정
    pub fn update<R>(&self, actor_id: &str, f: impl FnOnce(&mut CombatSessionData) -> R) -> Option<R> {
        self.sessions.get_mut(actor_id).map(|mut s| f(s.value_mut()))
    }

    /// 세션이 없으면 만든 뒤 수정
    pub fn upsert<R>(&self, actor_id: &str, f: impl FnOnce(&mut CombatSessionData) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(actor_id.to_string())
            .or_insert_with(|| CombatSessionData::new(actor_id));
        f(entry.value_mut())
    }

    /// 세션 가드를 쥔 채로 판단하고, 필요하면 같은 가드 안에서 제거
    ///
    /// `f`는 세션이 없으면 `None`을 받고 `(제거 여부, 결과)`를 돌려줍니다.
    /// 세션이 없을 때도 해당 샤드를 잠근 상태로 호출되므로, 같은 액터의
    /// `upsert`와 엇갈리지 않습니다.
    pub fn settle<R>(
        &self,
        actor_id: &str,
        f: impl FnOnce(Option<&mut CombatSessionData>) -> (bool, R),
    ) -> R {
        match self.sessions.entry(actor_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let (remove, result) = f(Some(entry.get_mut()));
                if remove {
                    entry.remove();
                }
                result
            }
            Entry::Vacant(_vacant) => f(None).1,
        }
    }

    pub fn targets(&self, actor_id: &str) -> BTreeSet<ActorId> {
        self.sessions
            .get(actor_id)
            .map(|s| s.targets.clone())
            .unwrap_or_default()
    }

    pub fn state(&self, actor_id: &str) -> CombatState {
        self.sessions
            .get(actor_id)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    /// 모든 세션의 타겟 목록에서 해당 액터 제거
    pub fn remove_target_everywhere(&self, target_id: &str) {
        for mut session in self.sessions.iter_mut() {
            session.targets.remove(target_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
