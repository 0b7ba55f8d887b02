//! 전투 모듈
//!
//! - `session`: 액터별 임시 전투 상태와 세션 레지스트리
//! - `damage`: 데미지 맵과 공격 간격 계산
//! - `engine`: 공격 루프, 타이밍 게이트, 사망 처리

pub mod damage;
pub mod engine;
pub mod session;

pub use damage::{attack_interval, calculate_damage_map};
pub use engine::{AttackResolution, CombatEngine};
pub use session::{CombatSessionData, CombatState, SessionRegistry};
