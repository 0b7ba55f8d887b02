//! 공통 타입 정의 모듈

use serde::{Deserialize, Serialize};

/// 액터 ID 타입 (플레이어와 몹이 공유하는 불투명 문자열 키)
pub type ActorId = String;

/// 2D 위치 좌표
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 무기 슬롯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeaponSlot {
    MainHand,
    OffHand,
}

impl WeaponSlot {
    /// 공격 루프가 매 틱마다 시도하는 슬롯 순서
    pub const ALL: [WeaponSlot; 2] = [WeaponSlot::MainHand, WeaponSlot::OffHand];
}

/// 스폰 템플릿 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    Player,
    Mob,
}
