//! 액터 속성 저장 모델과 파생 스탯 재계산
//!
//! `Stats`는 한 액터의 기본 스탯, 아이템 효과, 파생 스탯을 보관합니다.
//! 파생 스탯은 `(기본 스탯, 아이템 효과)`의 결정적 순수 함수인 [`derive_stats`]로
//! 계산되며, `recalculate`는 이전 값과 달라진 항목만 diff로 돌려줍니다.
//!
//! # 재계산 공식
//! | 파생 스탯 | 공식 |
//! |---|---|
//! | MAX_HP | 100 + 10·STA + 10·LEVEL + item |
//! | MAX_MP | 50 + 10·INT + 5·LEVEL + item |
//! | PHY_AMP | 1 + STR/100 + item |
//! | MAG_AMP | 1 + INT/100 + item |
//! | PHY_CRIT | 5 + DEX/10 + item |
//! | ATTACK_SPEED | DEX/10 + item |
//! | WEAPON_DAMAGE | item |
//! | WEAPON_ATTACK_SPEED | item |
//! | HP_REGEN | 1 + STA/20 + item |
//! | MP_REGEN | 1 + INT/20 + item |
//!
//! 현재 HP/MP는 재계산 대상이 아니며 최대값으로 잘리지도 않습니다.

use serde::{Deserialize, Serialize};

use super::stats_types::{
    BaseStat, BaseStats, DamageMap, DerivedStat, DerivedStats, ItemEffects, StatsDiff,
};
use crate::types::{ActorId, TemplateKind};

/// 액터 스탯 엔티티
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub actor_id: ActorId,
    #[serde(default)]
    pub base_stats: BaseStats,
    #[serde(default)]
    pub derived_stats: DerivedStats,
    #[serde(default)]
    pub item_effects: ItemEffects,
    #[serde(default)]
    pub attribute_points: i32,
}

impl Stats {
    pub fn new(actor_id: impl Into<ActorId>) -> Self {
        Self {
            actor_id: actor_id.into(),
            base_stats: BaseStats::new(),
            derived_stats: DerivedStats::new(),
            item_effects: ItemEffects::new(),
            attribute_points: 0,
        }
    }

    /// 스폰 템플릿으로 초기 스탯 생성
    ///
    /// 재계산 후 현재 HP/MP를 최대값으로 채웁니다.
    pub fn from_template(actor_id: impl Into<ActorId>, kind: TemplateKind, level: i32) -> Self {
        let mut stats = Self::new(actor_id);

        let (strength, stamina, dexterity, intellect) = match kind {
            TemplateKind::Player => (15, 15, 15, 15),
            TemplateKind::Mob => (50, 100, 100, 100),
        };
        stats.set_base(BaseStat::Strength, strength);
        stats.set_base(BaseStat::Stamina, stamina);
        stats.set_base(BaseStat::Dexterity, dexterity);
        stats.set_base(BaseStat::Intellect, intellect);
        stats.set_base(BaseStat::Level, level);

        // 몹은 장비 대신 타고난 무기를 아이템 효과로 가집니다
        if kind == TemplateKind::Mob {
            stats.item_effects.insert(DerivedStat::WeaponDamage, 20.0);
            stats.item_effects.insert(DerivedStat::WeaponAttackSpeed, 5.0);
        }

        stats.recalculate();
        let max_hp = stats.derived(DerivedStat::MaxHp);
        let max_mp = stats.derived(DerivedStat::MaxMp);
        stats.set_derived(DerivedStat::CurrentHp, max_hp);
        stats.set_derived(DerivedStat::CurrentMp, max_mp);
        stats
    }

    /// 기본 스탯 조회 (없으면 0)
    pub fn base(&self, stat: BaseStat) -> i32 {
        self.base_stats.get(&stat).copied().unwrap_or(0)
    }

    pub fn set_base(&mut self, stat: BaseStat, value: i32) {
        self.base_stats.insert(stat, value);
    }

    /// 파생 스탯 조회 (없으면 0)
    pub fn derived(&self, stat: DerivedStat) -> f64 {
        self.derived_stats.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn set_derived(&mut self, stat: DerivedStat, value: f64) {
        self.derived_stats.insert(stat, value);
    }

    pub fn is_alive(&self) -> bool {
        self.derived(DerivedStat::CurrentHp) > 0.0
    }

    /// 파생 스탯 재계산
    ///
    /// 이전 값과 다른 항목만 반환합니다. 입력이 바뀌지 않았다면 빈 diff입니다.
    pub fn recalculate(&mut self) -> StatsDiff {
        let computed = derive_stats(&self.base_stats, &self.item_effects);
        let mut diff = StatsDiff::new();

        for (stat, value) in computed {
            if self.derived_stats.get(&stat) != Some(&value) {
                self.derived_stats.insert(stat, value);
                diff.insert(stat, value);
            }
        }

        diff
    }

    /// 데미지 적용 (인메모리)
    ///
    /// 데미지 타입 순서대로 현재 HP에서 차감합니다. 0 아래로도 내려갑니다.
    /// 변경이 있으면 CURRENT_HP 항목 하나만 담은 diff를 반환합니다.
    pub fn take_damage(&mut self, damage: &DamageMap) -> StatsDiff {
        let before = self.derived(DerivedStat::CurrentHp);
        let mut current = before;
        for amount in damage.values() {
            current -= amount;
        }
        self.set_current(DerivedStat::CurrentHp, before, current)
    }

    /// 회복 적용 (인메모리)
    ///
    /// 최대 HP까지만 올라가며, 이미 최대값을 넘은 HP를 깎지는 않습니다.
    pub fn heal(&mut self, amount: f64) -> StatsDiff {
        self.raise_towards_cap(DerivedStat::CurrentHp, DerivedStat::MaxHp, amount)
    }

    /// HP/MP 리젠 1틱 적용 (인메모리)
    pub fn regen(&mut self) -> StatsDiff {
        let hp_regen = self.derived(DerivedStat::HpRegen);
        let mp_regen = self.derived(DerivedStat::MpRegen);

        let mut diff = self.raise_towards_cap(DerivedStat::CurrentHp, DerivedStat::MaxHp, hp_regen);
        diff.extend(self.raise_towards_cap(DerivedStat::CurrentMp, DerivedStat::MaxMp, mp_regen));
        diff
    }

    fn raise_towards_cap(&mut self, current: DerivedStat, max: DerivedStat, amount: f64) -> StatsDiff {
        let before = self.derived(current);
        let cap = self.derived(max);

        if amount <= 0.0 || before >= cap {
            return StatsDiff::new();
        }

        let after = (before + amount).min(cap);
        self.set_current(current, before, after)
    }

    fn set_current(&mut self, stat: DerivedStat, before: f64, after: f64) -> StatsDiff {
        let mut diff = StatsDiff::new();
        if after != before || !self.derived_stats.contains_key(&stat) {
            self.set_derived(stat, after);
            diff.insert(stat, after);
        }
        diff
    }
}

/// 기본 스탯과 아이템 효과로부터 파생 스탯을 계산하는 순수 함수
///
/// 현재 HP/MP는 결과에 포함되지 않습니다.
pub fn derive_stats(base: &BaseStats, items: &ItemEffects) -> DerivedStats {
    let stat = |s: BaseStat| base.get(&s).copied().unwrap_or(0) as f64;
    let item = |s: DerivedStat| items.get(&s).copied().unwrap_or(0.0);

    let strength = stat(BaseStat::Strength);
    let stamina = stat(BaseStat::Stamina);
    let dexterity = stat(BaseStat::Dexterity);
    let intellect = stat(BaseStat::Intellect);
    let level = stat(BaseStat::Level);

    let mut derived = DerivedStats::new();
    derived.insert(
        DerivedStat::MaxHp,
        100.0 + stamina * 10.0 + level * 10.0 + item(DerivedStat::MaxHp),
    );
    derived.insert(
        DerivedStat::MaxMp,
        50.0 + intellect * 10.0 + level * 5.0 + item(DerivedStat::MaxMp),
    );
    derived.insert(
        DerivedStat::PhysicalAmp,
        1.0 + strength / 100.0 + item(DerivedStat::PhysicalAmp),
    );
    derived.insert(
        DerivedStat::MagicAmp,
        1.0 + intellect / 100.0 + item(DerivedStat::MagicAmp),
    );
    derived.insert(
        DerivedStat::PhysicalCrit,
        5.0 + dexterity / 10.0 + item(DerivedStat::PhysicalCrit),
    );
    derived.insert(
        DerivedStat::AttackSpeed,
        dexterity / 10.0 + item(DerivedStat::AttackSpeed),
    );
    derived.insert(DerivedStat::WeaponDamage, item(DerivedStat::WeaponDamage));
    derived.insert(
        DerivedStat::WeaponAttackSpeed,
        item(DerivedStat::WeaponAttackSpeed),
    );
    derived.insert(
        DerivedStat::HpRegen,
        1.0 + stamina / 20.0 + item(DerivedStat::HpRegen),
    );
    derived.insert(
        DerivedStat::MpRegen,
        1.0 + intellect / 20.0 + item(DerivedStat::MpRegen),
    );
    derived
}
