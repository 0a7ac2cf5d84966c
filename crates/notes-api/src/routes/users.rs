//! 사용자 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/users` - 사용자 목록 (ADMIN/HOST)
//! - `GET /api/v1/users/me` - 현재 사용자
//! - `GET /api/v1/users/{id}` - 프로필 조회
//! - `PATCH /api/v1/users/{id}` - 프로필 수정 (본인 또는 ADMIN/HOST)
//! - `DELETE /api/v1/users/{id}` - 탈퇴 (본인 또는 ADMIN/HOST)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::auth::Caller;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::services::{UpdateUserRequest, UserListResponse, UserView};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "사용자 목록", body = UserListResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<UserListResponse>> {
    Ok(Json(state.users().list_users(caller.identity()).await?))
}

/// 현재 사용자. 삭제된 사용자의 토큰이면 401.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "현재 사용자", body = UserView),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.users().current_user(caller.identity()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "프로필", body = UserView),
        (status = 404, description = "없는 사용자", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.users().get_user(caller.identity(), id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "사용자 ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "수정 완료", body = UserView),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 409, description = "이미 존재하는 사용자명", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.users().update_user(caller.identity(), id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "사용자 ID")),
    responses(
        (status = 204, description = "삭제 완료"),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.users().delete_user(caller.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 사용자 라우터 생성.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(current_user))
        .route("/{id}", get(get_user).patch(update_user).delete(delete_user))
}
