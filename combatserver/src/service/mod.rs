//! 협력자 구현체
//!
//! - `memory`: 단일 프로세스 실행과 테스트용 인메모리 구현
//! - `redis_stats`: Redis 기반 스탯 저장소
//! - `notifier`: tokio 브로드캐스트 기반 알림 채널

pub mod memory;
pub mod notifier;
pub mod redis_stats;

pub use memory::{InMemoryStatsRepository, InMemoryWorld};
pub use notifier::BroadcastNotifier;
pub use redis_stats::RedisStatsRepository;
