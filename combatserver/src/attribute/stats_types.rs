//! 스탯 종류 정의
//!
//! 기본 스탯(할당 가능한 정수 속성)과 파생 스탯(재계산으로 얻는 실수 속성),
//! 데미지 타입을 정의합니다. 직렬화 이름은 클라이언트 프로토콜과 동일한
//! `SCREAMING_SNAKE_CASE`를 사용합니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 기본 스탯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaseStat {
    #[serde(rename = "STR")]
    Strength,
    #[serde(rename = "STA")]
    Stamina,
    #[serde(rename = "DEX")]
    Dexterity,
    #[serde(rename = "INT")]
    Intellect,
    #[serde(rename = "LEVEL")]
    Level,
}

impl BaseStat {
    /// 속성 포인트로 올릴 수 있는지 여부 (레벨은 제외)
    pub fn is_allocatable(&self) -> bool {
        !matches!(self, BaseStat::Level)
    }
}

/// 파생 스탯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DerivedStat {
    CurrentHp,
    MaxHp,
    CurrentMp,
    MaxMp,
    /// 공격 속도 (%) - 100이면 공격 간격이 절반
    AttackSpeed,
    /// 무기 기본 공격 간격 (초)
    WeaponAttackSpeed,
    WeaponDamage,
    #[serde(rename = "PHY_AMP")]
    PhysicalAmp,
    #[serde(rename = "MAG_AMP")]
    MagicAmp,
    #[serde(rename = "PHY_CRIT")]
    PhysicalCrit,
    HpRegen,
    MpRegen,
}

/// 데미지 타입
///
/// 현재 평타는 PHYSICAL만 생성합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum DamageType {
    Physical,
}

pub type BaseStats = BTreeMap<BaseStat, i32>;
pub type DerivedStats = BTreeMap<DerivedStat, f64>;
pub type ItemEffects = BTreeMap<DerivedStat, f64>;

/// 한 번의 타격에서 생성되어 즉시 소비되는 데미지 맵
///
/// BTreeMap이므로 적용 순서가 항상 결정적입니다.
pub type DamageMap = BTreeMap<DamageType, f64>;

/// 재계산 또는 변경으로 값이 바뀐 파생 스탯만 담은 diff
pub type StatsDiff = BTreeMap<DerivedStat, f64>;
