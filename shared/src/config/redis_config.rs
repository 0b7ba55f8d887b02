use dotenv::dotenv;
use redis::{aio::ConnectionManager, Client};
use std::env;

use crate::tool::error::AppError;

pub type RedisConnection = ConnectionManager;

#[derive(Clone)]
pub struct RedisConfig {
    pub conn: RedisConnection,
    pub host: String,
    pub port: u16,
}

impl RedisConfig {
    pub async fn new() -> Result<Self, AppError> {
        // .env 파일 로드 (현재 디렉토리와 상위 디렉토리에서 찾기)
        let env_paths = [".env", "../.env", "../../.env"];
        let mut env_loaded = false;

        for path in env_paths {
            if std::path::Path::new(path).exists() {
                dotenv::from_filename(path).ok();
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            dotenv().ok(); // 기본 .env 파일 시도
        }

        let host = env::var("redis_host").unwrap_or_else(|_| {
            tracing::info!("redis_host 환경변수가 없어서 localhost를 사용합니다.");
            "localhost".to_string()
        });

        let port = env::var("redis_port")
            .unwrap_or_else(|_| "6379".to_string())
            .parse::<u16>()
            .map_err(|e| AppError::Configuration(format!("redis_port는 숫자여야 함: {e}")))?;

        Self::connect(host, port).await
    }

    pub async fn connect(host: String, port: u16) -> Result<Self, AppError> {
        let client = Client::open(format!("redis://{}:{}", host, port))
            .map_err(|e| AppError::Configuration(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::RedisConnection(e.to_string()))?;
        Ok(Self {
            conn: manager,
            host,
            port,
        })
    }

    pub fn get_connection(&self) -> RedisConnection {
        self.conn.clone()
    }
}
