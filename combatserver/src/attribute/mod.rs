//! 속성 모듈
//!
//! - `stats_types`: 기본/파생 스탯과 데미지 타입 정의
//! - `store`: 스탯 엔티티와 파생 스탯 재계산 (순수 계산)
//! - `service`: 초기화, 데미지/회복/리젠, 저장 및 diff 알림 조율

pub mod service;
pub mod stats_types;
pub mod store;

pub use service::{DamageOutcome, StatsService};
pub use stats_types::{
    BaseStat, BaseStats, DamageMap, DamageType, DerivedStat, DerivedStats, ItemEffects, StatsDiff,
};
pub use store::{derive_stats, Stats};
