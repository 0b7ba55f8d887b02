//! Combat Server Library
//!
//! 멀티플레이어 게임 서버의 전투/속성 서브시스템입니다.
//!
//! # 구성
//! - `attribute`: 기본/파생 스탯, 재계산, 데미지/회복/리젠, 저장 후 diff 알림
//! - `combat`: 교전 세션, 액터별 공격 루프, 스윙 신호, 데미지 계산, 사망 처리
//! - `regen`: 주기적 리젠 스윕
//! - `traits`: 저장소, 알림, 장비, 상태 이상, 세션 컨텍스트 협력자
//! - `service`: 협력자 구현체 (인메모리, Redis, 브로드캐스트)

pub mod attribute;
pub mod combat;
pub mod config;
pub mod messages;
pub mod regen;
pub mod service;
pub mod traits;
pub mod types;

pub use attribute::{
    BaseStat, DamageOutcome, DamageType, DerivedStat, Stats, StatsDiff, StatsService,
};
pub use combat::{AttackResolution, CombatEngine, CombatState, SessionRegistry};
pub use config::CombatServerConfig;
pub use messages::CombatEvent;
pub use regen::RegenTicker;
pub use types::{ActorId, Position, TemplateKind, WeaponSlot};
