//! Shared Library
//!
//! 전투 서버와 주변 서비스가 공통으로 사용하는 에러 타입, Redis 설정,
//! Redis 키 규칙을 제공합니다.

pub mod config;
pub mod service;
pub mod tool;
