//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (저장소 연결 포함)
//! - `/api/v1/auth` - 가입/로그인
//! - `/api/v1/users` - 사용자 프로필
//! - `/api/v1/notes` - 노트
//! - `/api/v1/attachments` - 첨부파일 메타데이터
//! - `/api/v1/categories` - 카테고리
//! - `/api/v1/tags` - 태그
//! - `/file/attachments/{id}/{filename}` - 첨부파일 본문
//! - `/api-docs/openapi.json` - OpenAPI 스펙
//!
//! `/metrics`는 별도 상태(Prometheus 핸들)를 쓰므로 바이너리에서 병합합니다.

pub mod attachments;
pub mod auth;
pub mod categories;
pub mod files;
pub mod health;
pub mod notes;
pub mod tags;
pub mod users;

pub use attachments::attachments_router;
pub use auth::auth_router;
pub use categories::categories_router;
pub use files::files_router;
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use notes::notes_router;
pub use tags::tags_router;
pub use users::users_router;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::openapi::openapi_json;
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 모든 서브 라우터를 조합한 뒤 신원 확인 미들웨어를 `route_layer`로 붙입니다.
/// 라우트 매칭 후에 실행되므로 미들웨어는 `/api/v1/notes/{id}` 같은 패턴으로 공개 여부를 판단합니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/users", users_router())
        .nest("/api/v1/notes", notes_router())
        .nest(
            "/api/v1/attachments",
            attachments_router(state.max_attachment_bytes),
        )
        .nest("/api/v1/categories", categories_router())
        .nest("/api/v1/tags", tags_router())
        .nest("/file", files_router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}
