//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성하고
//! `/api-docs/openapi.json`으로 노출합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `paths(...)` 섹션에 추가

use axum::Json;
use utoipa::OpenApi;

use crate::error::ApiErrorResponse;
use crate::routes::{ComponentHealth, ComponentStatus, HealthResponse};

/// Notes API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Notes API",
        description = r#"
# 노트 서비스 REST API

노트 작성과 공개 범위 관리, 첨부파일, 카테고리, 태그를 위한 REST API입니다.

## 인증

쓰기 요청과 비공개 자원 조회에는 `Authorization: Bearer <token>` 헤더가 필요합니다.
토큰은 `POST /api/v1/auth/login`으로 발급받습니다.

## 자원 이름

응답의 `name` 필드와 참조 필드(`note`, `category`, `tags`, `parent`)는
`notes/12`처럼 `{종류}/{id}` 형식을 사용합니다.
"#
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 가입 및 로그인"),
        (name = "users", description = "사용자 - 프로필 조회/수정/탈퇴"),
        (name = "notes", description = "노트 - 작성, 조회, 공개 범위"),
        (name = "attachments", description = "첨부파일 - 업로드, 노트 연결, 다운로드"),
        (name = "categories", description = "카테고리 - 계층형 분류"),
        (name = "tags", description = "태그 - 노트 태그 관리")
    ),
    components(
        schemas(
            ApiErrorResponse,
            HealthResponse,
            ComponentHealth,
            ComponentStatus,
        )
    ),
    paths(
        // ===== Health =====
        crate::routes::health::health_check,

        // ===== Auth / Users =====
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::users::list_users,
        crate::routes::users::current_user,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,

        // ===== Notes =====
        crate::routes::notes::list_notes,
        crate::routes::notes::get_note,
        crate::routes::notes::create_note,
        crate::routes::notes::update_note,
        crate::routes::notes::delete_note,

        // ===== Attachments =====
        crate::routes::attachments::list_attachments,
        crate::routes::attachments::create_attachment,
        crate::routes::attachments::get_attachment,
        crate::routes::attachments::update_attachment,
        crate::routes::attachments::delete_attachment,
        crate::routes::files::download_attachment,

        // ===== Categories =====
        crate::routes::categories::list_categories,
        crate::routes::categories::get_category,
        crate::routes::categories::create_category,
        crate::routes::categories::update_category,
        crate::routes::categories::delete_category,

        // ===== Tags =====
        crate::routes::tags::list_tags,
        crate::routes::tags::get_tag,
        crate::routes::tags::create_tag,
        crate::routes::tags::update_tag,
        crate::routes::tags::delete_tag,
    )
)]
pub struct ApiDoc;

/// OpenAPI JSON 스펙.
///
/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
