//! 전투 이벤트 프로토콜
//!
//! 브로드캐스트/세션 계층으로 전달되는 알림 메시지입니다.
//! JSON 직렬화 시 `type` 필드로 구분됩니다.

use serde::{Deserialize, Serialize};

use crate::attribute::StatsDiff;
use crate::types::{ActorId, WeaponSlot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombatEvent {
    /// 변경된 파생 스탯만 전달
    StatsUpdated {
        actor_id: ActorId,
        derived_stats: StatsDiff,
    },
    /// 사망/디스폰으로 제거된 액터
    ActorsRemoved { actor_ids: Vec<ActorId> },
    /// 공격 모션 시작 신호 (명중 여부 확정 전)
    SwingTelegraph {
        actor_id: ActorId,
        item_instance_id: String,
        slot: WeaponSlot,
    },
    ChannelStarted { actor_id: ActorId },
    ChannelCompleted { actor_id: ActorId },
    ChannelInterrupted { actor_id: ActorId },
}

impl CombatEvent {
    /// 이벤트의 주체 액터
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            CombatEvent::StatsUpdated { actor_id, .. }
            | CombatEvent::SwingTelegraph { actor_id, .. }
            | CombatEvent::ChannelStarted { actor_id }
            | CombatEvent::ChannelCompleted { actor_id }
            | CombatEvent::ChannelInterrupted { actor_id } => Some(actor_id),
            CombatEvent::ActorsRemoved { .. } => None,
        }
    }
}
