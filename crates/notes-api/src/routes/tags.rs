//! 태그 API 라우트.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::auth::Caller;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::services::{CreateTagRequest, ListTagsParams, TagListResponse, TagView, UpdateTagRequest};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/tags",
    params(ListTagsParams),
    responses((status = 200, description = "태그 목록", body = TagListResponse)),
    tag = "tags"
)]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTagsParams>,
) -> ApiResult<Json<TagListResponse>> {
    Ok(Json(state.tags().list_tags(params).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/{id}",
    params(("id" = i64, Path, description = "태그 ID")),
    responses(
        (status = 200, description = "태그", body = TagView),
        (status = 404, description = "없는 태그", body = ApiErrorResponse)
    ),
    tag = "tags"
)]
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagView>> {
    Ok(Json(state.tags().get_tag(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "작성 완료", body = TagView),
        (status = 409, description = "이미 존재하는 태그", body = ApiErrorResponse)
    ),
    tag = "tags"
)]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<TagView>)> {
    let tag = state.tags().create_tag(caller.identity(), req).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tags/{id}",
    params(("id" = i64, Path, description = "태그 ID")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "수정 완료", body = TagView),
        (status = 409, description = "이미 존재하는 태그", body = ApiErrorResponse)
    ),
    tag = "tags"
)]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTagRequest>,
) -> ApiResult<Json<TagView>> {
    Ok(Json(state.tags().update_tag(caller.identity(), id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tags/{id}",
    params(("id" = i64, Path, description = "태그 ID")),
    responses(
        (status = 204, description = "삭제 완료"),
        (status = 409, description = "노트에 사용 중인 태그", body = ApiErrorResponse)
    ),
    tag = "tags"
)]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.tags().delete_tag(caller.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 태그 라우터 생성.
pub fn tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/{id}", get(get_tag).patch(update_tag).delete(delete_tag))
}
