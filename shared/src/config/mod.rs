pub mod redis_config;

pub use redis_config::{RedisConfig, RedisConnection};
