//! Redis 스탯 저장소
//!
//! `actor_stats:{actor_id}` 키에 JSON 문자열로 저장합니다.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use crate::attribute::Stats;
use crate::traits::StatsRepository;
use shared::config::RedisConfig;
use shared::service::KeyType;
use shared::tool::error::AppError;

#[derive(Clone)]
pub struct RedisStatsRepository {
    redis_config: RedisConfig,
    key_type: KeyType,
}

impl RedisStatsRepository {
    pub fn new(redis_config: RedisConfig) -> Self {
        Self {
            redis_config,
            key_type: KeyType::ActorStats,
        }
    }
}

#[async_trait]
impl StatsRepository for RedisStatsRepository {
    async fn fetch(&self, actor_id: &str) -> Result<Stats, AppError> {
        let mut conn = self.redis_config.get_connection();
        let key = self.key_type.get_key(actor_id);

        let raw: Option<String> = conn.get(&key).await?;
        let raw = raw.ok_or_else(|| AppError::ActorNotFound(actor_id.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn upsert(&self, stats: &Stats) -> Result<(), AppError> {
        let mut conn = self.redis_config.get_connection();
        let key = self.key_type.get_key(&stats.actor_id);
        let payload = serde_json::to_string(stats)?;

        conn.set::<_, _, ()>(&key, payload)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        debug!(key = %key, "Stats stored");
        Ok(())
    }

    async fn delete(&self, actor_id: &str) -> Result<(), AppError> {
        let mut conn = self.redis_config.get_connection();
        let key = self.key_type.get_key(actor_id);

        let removed: i64 = conn
            .del(&key)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        if removed == 0 {
            return Err(AppError::ActorNotFound(actor_id.to_string()));
        }
        Ok(())
    }
}
