//! 가입/로그인 API 라우트.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/auth/register` - 가입 (첫 사용자는 HOST)
//! - `POST /api/v1/auth/login` - 로그인, 액세스 토큰 발급

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use std::sync::Arc;

use crate::error::{ApiErrorResponse, ApiResult};
use crate::metrics::record_login;
use crate::services::{LoginRequest, LoginResponse, RegisterRequest, UserView};
use crate::state::AppState;

/// 가입.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "가입 완료", body = UserView),
        (status = 400, description = "입력값 오류", body = ApiErrorResponse),
        (status = 409, description = "이미 존재하는 사용자명", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = state.users().register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// 로그인.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "토큰 발급", body = LoginResponse),
        (status = 401, description = "사용자명 또는 비밀번호 불일치", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let result = state.users().login(req, Utc::now()).await;
    record_login(result.is_ok());
    Ok(Json(result?))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
