//! # Notes Core
//!
//! 노트 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 사용자, 역할 및 공개 범위 타입
//! - 노트, 첨부파일, 카테고리, 태그 모델
//! - 저장소 추상화 (`Store` trait)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
