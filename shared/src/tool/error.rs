//! 공통 에러 관리 시스템
//!
//! 전투/속성 서브시스템에서 발생하는 모든 에러를 체계적으로 관리합니다.
//! 검증 실패는 조용히 무시되고, 조회 실패는 호출자에게 전달되며,
//! 저장/알림 실패는 로깅만 하고 게임 로직을 막지 않습니다.

use thiserror::Error;
use tracing::{error, info, warn};

/// 공통 애플리케이션 에러 정의
///
/// 각 에러는 심각도를 가지며 `log`를 통해 적절한 레벨로 기록됩니다.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    // 조회 관련 에러
    #[error("액터 스탯을 찾을 수 없습니다: {0}")]
    ActorNotFound(String),

    // 입력값 검증 에러
    #[error("검증 실패: {0}")]
    Validation(String),

    // 저장소 관련 에러
    #[error("저장 실패: {0}")]
    Persistence(String),

    #[error("Redis 연결 실패: {0}")]
    RedisConnection(String),

    #[error("직렬화 실패: {0}")]
    Serialization(String),

    // 알림 관련 에러
    #[error("알림 전송 실패: {0}")]
    Notification(String),

    // 시스템 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("내부 서버 에러: {0}")]
    InternalError(String),
}

impl AppError {
    /// 에러의 심각도를 반환합니다.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Critical: 시스템 장애
            AppError::RedisConnection(_) | AppError::Configuration(_) => ErrorSeverity::Critical,

            // High: 상태 유실 가능성
            AppError::Persistence(_)
            | AppError::Serialization(_)
            | AppError::InternalError(_) => ErrorSeverity::High,

            // Medium: 호출자에게 전달되는 실패
            AppError::ActorNotFound(_) | AppError::Notification(_) => ErrorSeverity::Medium,

            // Low: 무시되는 요청
            AppError::Validation(_) => ErrorSeverity::Low,
        }
    }

    /// 에러를 로깅합니다.
    ///
    /// 심각도에 따라 적절한 로깅 레벨을 사용합니다.
    pub fn log(&self, context: &str) {
        let error_msg = self.to_string();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!("[CRITICAL] {} - {}", context, error_msg);
            }
            ErrorSeverity::High => {
                error!("[HIGH] {} - {}", context, error_msg);
            }
            ErrorSeverity::Medium => {
                warn!("[MEDIUM] {} - {}", context, error_msg);
            }
            ErrorSeverity::Low => {
                info!("[LOW] {} - {}", context, error_msg);
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ActorNotFound(_))
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorSeverity {
    Critical, // 시스템 장애
    High,     // 상태 유실 가능성
    Medium,   // 호출자 처리 필요
    Low,      // 일반적인 경고
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            AppError::RedisConnection(err.to_string())
        } else {
            AppError::Persistence(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}
