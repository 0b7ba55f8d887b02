//! 데미지 계산
//!
//! `total = WEAPON_DAMAGE × PHY_AMP × (1 + uniform(0, variance))`
//!
//! 결정적인 배율 위에 랜덤 분산 레이어를 얹습니다. 난수 생성기는 호출자가
//! 주입하므로 시드를 고정하면 결과가 재현됩니다.

use rand::Rng;
use std::time::Duration;

use crate::attribute::{DamageMap, DamageType, DerivedStat, DerivedStats};
use crate::traits::EquippedWeapon;

/// 무기와 공격자 파생 스탯으로 데미지 맵 생성
///
/// 현재는 PHYSICAL 타입만 생성합니다.
pub fn calculate_damage_map<R: Rng + ?Sized>(
    weapon: &EquippedWeapon,
    attacker: &DerivedStats,
    variance: f64,
    rng: &mut R,
) -> DamageMap {
    let damage = weapon
        .item_effects
        .get(&DerivedStat::WeaponDamage)
        .copied()
        .unwrap_or(0.0);
    let amp = attacker
        .get(&DerivedStat::PhysicalAmp)
        .copied()
        .unwrap_or(0.0);

    let roll = if variance > 0.0 {
        rng.gen_range(0.0..variance)
    } else {
        0.0
    };

    DamageMap::from([(DamageType::Physical, damage * amp * (1.0 + roll))])
}

/// 실제 공격 간격
///
/// 공격 속도 100이면 간격이 절반이 됩니다. 계산이 불가능한 값이면 공격 불가(`Duration::MAX`)로 봅니다.
pub fn attack_interval(base_speed_secs: f64, attack_speed_stat: f64) -> Duration {
    let divisor = 1.0 + attack_speed_stat / 100.0;
    if divisor <= 0.0 {
        return Duration::MAX;
    }
    Duration::try_from_secs_f64(base_speed_secs / divisor).unwrap_or(Duration::MAX)
}
