//! 외부 협력자 trait 정의
//!
//! 전투 코어가 소유하지 않는 모든 서브시스템은 trait으로 정의됩니다:
//! - 의존성 주입
//! - 테스트용 인메모리 구현으로 교체
//! - 저장소/전송 계층과의 느슨한 결합

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::attribute::{DerivedStats, ItemEffects, Stats};
use crate::messages::CombatEvent;
use crate::types::{Position, WeaponSlot};
use shared::tool::error::AppError;

// ============================================================================
// PERSISTENCE
// ============================================================================

/// 액터 스탯 저장소 (actor_id 키 기반 비동기 저장소)
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// 저장된 스탯 조회. 없으면 `AppError::ActorNotFound`
    async fn fetch(&self, actor_id: &str) -> Result<Stats, AppError>;
    async fn upsert(&self, stats: &Stats) -> Result<(), AppError>;
    async fn delete(&self, actor_id: &str) -> Result<(), AppError>;
}

// ============================================================================
// NOTIFICATION
// ============================================================================

/// 클라이언트 알림 채널
///
/// 최대 1회, best-effort 전송입니다. 실패는 호출자가 로깅만 합니다.
pub trait UpdateNotifier: Send + Sync {
    fn publish(&self, event: CombatEvent) -> Result<(), AppError>;
}

// ============================================================================
// WORLD / SESSION CONTEXT
// ============================================================================

/// 장착된 무기 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquippedWeapon {
    pub item_instance_id: String,
    /// 공격 사거리. 없으면 설정의 기본 사거리를 사용
    pub attack_range: Option<f64>,
    /// WEAPON_DAMAGE, WEAPON_ATTACK_SPEED 등 무기 효과
    #[serde(default)]
    pub item_effects: ItemEffects,
}

/// 장비 제공자
#[async_trait]
pub trait EquipmentProvider: Send + Sync {
    async fn equipped_weapon(&self, actor_id: &str, slot: WeaponSlot) -> Option<EquippedWeapon>;
}

/// 상태 이상 제공자 (행동 불가 여부)
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn can_act(&self, actor_id: &str) -> bool;
}

/// 연결/세션 컨텍스트
///
/// 실시간 요청에 필요한 위치와 파생 스탯 스냅샷을 읽기 전용으로 제공합니다.
#[async_trait]
pub trait SessionContext: Send + Sync {
    async fn position(&self, actor_id: &str) -> Option<Position>;
    async fn derived_stats(&self, actor_id: &str) -> Option<DerivedStats>;
}
