//! 전투 서버 설정 관리
//!
//! 환경변수를 통한 설정 로드 및 관리
//! - 전투 설정 (틱 주기, 스윙 선행 시간, 데미지 분산, 기본 사거리)
//! - 리젠 설정 (리젠 스윕 주기)
//! - 저장소 설정 (memory / redis)
//! - 알림 설정 (브로드캐스트 채널 용량)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// 전투 서버 메인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatServerConfig {
    pub combat: CombatConfig,
    pub regen: RegenConfig,
    pub storage: StorageConfig,
    pub notification: NotificationConfig,
}

/// 전투 루프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// 공격 루프 틱 주기 (밀리초)
    pub tick_interval_ms: u64,
    /// 공격 가능 시점 이전 스윙 신호 선행 시간 (밀리초)
    pub swing_lead_ms: u64,
    /// 데미지 랜덤 분산 상한 (0.15 = 최대 +15%)
    pub damage_variance: f64,
    /// 무기에 사거리가 없을 때의 기본 사거리
    pub default_attack_range: f64,
    /// 무기에 공격 간격이 없을 때의 기본 간격 (초)
    pub default_weapon_speed_secs: f64,
    /// 데미지 분산 난수 시드 (없으면 엔트로피 사용)
    pub rng_seed: Option<u64>,
}

/// 리젠 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenConfig {
    /// 리젠 스윕 주기 (밀리초)
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Redis,
}

/// 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,
}

impl CombatServerConfig {
    /// 환경변수로부터 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            combat: CombatConfig::from_env()?,
            regen: RegenConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            notification: NotificationConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// 설정 유효성 검사
    pub fn validate(&self) -> Result<()> {
        if self.combat.tick_interval_ms == 0 {
            return Err(anyhow::anyhow!("Combat tick interval must be > 0"));
        }

        // 스윙 선행 시간은 틱 100회를 넘지 않아야 합니다
        let max_swing_lead_ms = self.combat.tick_interval_ms.saturating_mul(100);
        if self.combat.swing_lead_ms >= max_swing_lead_ms {
            return Err(anyhow::anyhow!(
                "Swing lead {}ms must be < {}ms",
                self.combat.swing_lead_ms,
                max_swing_lead_ms
            ));
        }

        if !(0.0..=1.0).contains(&self.combat.damage_variance) {
            return Err(anyhow::anyhow!(
                "Invalid damage variance: {} (must be 0.0-1.0)",
                self.combat.damage_variance
            ));
        }

        if self.combat.default_attack_range <= 0.0 {
            return Err(anyhow::anyhow!("Default attack range must be > 0"));
        }

        if self.combat.default_weapon_speed_secs <= 0.0 {
            return Err(anyhow::anyhow!("Default weapon speed must be > 0"));
        }

        if self.regen.interval_ms == 0 {
            return Err(anyhow::anyhow!("Regen interval must be > 0"));
        }

        if self.notification.channel_capacity == 0 {
            return Err(anyhow::anyhow!("Notification channel capacity must be > 0"));
        }

        Ok(())
    }

    /// 개발 환경용 기본 설정
    pub fn development() -> Self {
        Self {
            combat: CombatConfig::development(),
            regen: RegenConfig { interval_ms: 1000 },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            notification: NotificationConfig {
                channel_capacity: 1000,
            },
        }
    }
}

impl CombatConfig {
    pub fn from_env() -> Result<Self> {
        let rng_seed = match env::var("COMBAT_RNG_SEED") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| anyhow::anyhow!("Invalid COMBAT_RNG_SEED: {}", e))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            tick_interval_ms: env::var("COMBAT_TICK_INTERVAL_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COMBAT_TICK_INTERVAL_MS: {}", e))?,
            swing_lead_ms: env::var("COMBAT_SWING_LEAD_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COMBAT_SWING_LEAD_MS: {}", e))?,
            damage_variance: env::var("COMBAT_DAMAGE_VARIANCE")
                .unwrap_or_else(|_| "0.15".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COMBAT_DAMAGE_VARIANCE: {}", e))?,
            default_attack_range: env::var("COMBAT_DEFAULT_ATTACK_RANGE")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COMBAT_DEFAULT_ATTACK_RANGE: {}", e))?,
            default_weapon_speed_secs: env::var("COMBAT_DEFAULT_WEAPON_SPEED_SECS")
                .unwrap_or_else(|_| "2.0".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COMBAT_DEFAULT_WEAPON_SPEED_SECS: {}", e))?,
            rng_seed,
        })
    }

    pub fn development() -> Self {
        Self {
            tick_interval_ms: 100,
            swing_lead_ms: 100,
            damage_variance: 0.15,
            default_attack_range: 200.0,
            default_weapon_speed_secs: 2.0,
            rng_seed: None,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn swing_lead(&self) -> Duration {
        Duration::from_millis(self.swing_lead_ms)
    }
}

impl RegenConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            interval_ms: env::var("REGEN_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid REGEN_INTERVAL_MS: {}", e))?,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "redis" => StorageBackend::Redis,
            other => return Err(anyhow::anyhow!("Invalid STORAGE_BACKEND: {}", other)),
        };
        Ok(Self { backend })
    }
}

impl NotificationConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            channel_capacity: env::var("NOTIFICATION_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid NOTIFICATION_CHANNEL_CAPACITY: {}", e))?,
        })
    }
}
