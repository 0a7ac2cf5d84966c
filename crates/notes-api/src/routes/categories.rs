//! 카테고리 API 라우트.
//!
//! 목록/조회는 공개, 작성/수정/삭제는 인증된 사용자만 가능합니다.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::auth::Caller;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::services::{
    CategoryListResponse, CategoryView, CreateCategoryRequest, ListCategoriesParams,
    UpdateCategoryRequest,
};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(ListCategoriesParams),
    responses((status = 200, description = "카테고리 목록", body = CategoryListResponse)),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListCategoriesParams>,
) -> ApiResult<Json<CategoryListResponse>> {
    Ok(Json(state.categories().list_categories(params).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "카테고리 ID")),
    responses(
        (status = 200, description = "카테고리", body = CategoryView),
        (status = 404, description = "없는 카테고리", body = ApiErrorResponse)
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryView>> {
    Ok(Json(state.categories().get_category(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "작성 완료", body = CategoryView),
        (status = 400, description = "입력값 오류", body = ApiErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<CategoryView>)> {
    let category = state.categories().create_category(caller.identity(), req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "카테고리 ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "수정 완료", body = CategoryView),
        (status = 400, description = "입력값 오류", body = ApiErrorResponse),
        (status = 404, description = "없는 카테고리", body = ApiErrorResponse)
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<CategoryView>> {
    Ok(Json(
        state.categories().update_category(caller.identity(), id, req).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "카테고리 ID")),
    responses(
        (status = 204, description = "삭제 완료"),
        (status = 409, description = "노트가 남아 있는 카테고리", body = ApiErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.categories().delete_category(caller.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 카테고리 라우터 생성.
pub fn categories_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).patch(update_category).delete(delete_category),
        )
}
