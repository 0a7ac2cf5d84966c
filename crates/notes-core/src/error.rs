//! 노트 서비스의 에러 타입.
//!
//! 설정 로드와 서버 기동 과정에서 발생하는 에러를 정의합니다.
//! 요청 단위의 에러는 API 크레이트의 `ServiceError`가 담당합니다.

use thiserror::Error;

/// 핵심 서비스 에러.
#[derive(Debug, Error)]
pub enum NotesError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 서비스 기동 작업을 위한 Result 타입.
pub type NotesResult<T> = Result<T, NotesError>;

impl NotesError {
    /// 기동을 중단해야 하는 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NotesError::Config(_) | NotesError::Database(_))
    }
}

impl From<serde_json::Error> for NotesError {
    fn from(err: serde_json::Error) -> Self {
        NotesError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for NotesError {
    fn from(err: config::ConfigError) -> Self {
        NotesError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_fatal() {
        let config_err = NotesError::Config("missing secret".to_string());
        assert!(config_err.is_fatal());

        let input_err = NotesError::InvalidInput("bad name".to_string());
        assert!(!input_err.is_fatal());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: NotesError = config::ConfigError::Message("boom".to_string()).into();
        assert!(matches!(err, NotesError::Config(msg) if msg.contains("boom")));
    }
}
