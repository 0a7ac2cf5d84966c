//! API 에러 타입.
//!
//! 서비스 계층은 [`ServiceError`]를 반환하고, 핸들러는 이를 그대로 `?`로 전파합니다.
//! HTTP 응답 변환은 [`IntoResponse`] 구현 한 곳에서 이루어집니다.
//!
//! | ServiceError              | 상태 코드 | code                 |
//! |---------------------------|-----------|----------------------|
//! | `AuthenticationRequired`  | 401       | `UNAUTHENTICATED`    |
//! | `Unauthenticated`         | 401       | `UNAUTHENTICATED`    |
//! | `PermissionDenied`        | 403       | `PERMISSION_DENIED`  |
//! | `NotFound`                | 404       | `NOT_FOUND`          |
//! | `InvalidArgument`         | 400       | `INVALID_ARGUMENT`   |
//! | `Conflict`                | 409       | `ALREADY_EXISTS`     |
//! | `Internal`                | 500       | `INTERNAL`           |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use notes_core::{ResourceNameError, StoreError};

use crate::auth::AccessDenied;

/// API 에러 응답 본문.
///
/// ```json
/// {
///   "code": "PERMISSION_DENIED",
///   "message": "permission denied"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "NOT_FOUND", "INVALID_ARGUMENT")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 서비스 계층 에러.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// 신원이 필요한데 없음
    #[error("authentication required")]
    AuthenticationRequired,

    /// 자격 증명 불일치 (로그인 실패)
    #[error("{0}")]
    Unauthenticated(String),

    /// 신원은 있으나 권한 없음
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(String),

    /// 저장소/내부 처리 실패. 메시지는 로그에만 남고 응답에는 노출되지 않습니다.
    #[error("internal error: {0}")]
    Internal(String),
}

/// 핸들러/서비스 Result 타입.
pub type ApiResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn permission_denied() -> Self {
        ServiceError::PermissionDenied("permission denied".to_string())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::AuthenticationRequired | ServiceError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::AuthenticationRequired | ServiceError::Unauthenticated(_) => {
                "UNAUTHENTICATED"
            }
            ServiceError::PermissionDenied(_) => "PERMISSION_DENIED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ServiceError::Conflict(_) => "ALREADY_EXISTS",
            ServiceError::Internal(_) => "INTERNAL",
        }
    }

    pub fn to_response_body(&self) -> ApiErrorResponse {
        match self {
            ServiceError::Internal(_) => ApiErrorResponse::new(self.code(), "internal error"),
            other => ApiErrorResponse::new(other.code(), other.to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let ServiceError::Internal(message) = &self {
            tracing::error!(error = %message, "Request failed with internal error");
        }
        (self.status_code(), Json(self.to_response_body())).into_response()
    }
}

impl From<AccessDenied> for ServiceError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::AuthenticationRequired => ServiceError::AuthenticationRequired,
            AccessDenied::PermissionDenied => ServiceError::permission_denied(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Database(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<ResourceNameError> for ServiceError {
    fn from(err: ResourceNameError) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect::<Vec<_>>();
        messages.sort();
        ServiceError::InvalidArgument(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::permission_denied().status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ServiceError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_access_denied_conversion() {
        let err: ServiceError = AccessDenied::AuthenticationRequired.into();
        assert!(matches!(err, ServiceError::AuthenticationRequired));
        let err: ServiceError = AccessDenied::PermissionDenied.into();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
    }

    #[test]
    fn test_internal_message_hidden() {
        let err: ServiceError = StoreError::Database("connection refused to 10.0.0.3".into()).into();
        let body = err.to_response_body();
        assert_eq!(body.code, "INTERNAL");
        assert!(!body.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_json_serialization() {
        let body = ApiErrorResponse::new("NOT_FOUND", "note not found");
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""code":"NOT_FOUND""#));
        assert!(json.contains(r#""message":"note not found""#));
    }
}
