//! 노트 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/notes` - 발행된 노트 목록 (호출자가 읽을 수 있는 것만)
//! - `POST /api/v1/notes` - 노트 작성
//! - `GET /api/v1/notes/{id}` - 노트 조회
//! - `PATCH /api/v1/notes/{id}` - 노트 수정
//! - `DELETE /api/v1/notes/{id}` - 노트 삭제

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::auth::Caller;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::services::{CreateNoteRequest, ListNotesParams, NoteListResponse, NoteView, UpdateNoteRequest};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/notes",
    params(ListNotesParams),
    responses(
        (status = 200, description = "노트 목록", body = NoteListResponse),
        (status = 400, description = "잘못된 필터", body = ApiErrorResponse)
    ),
    tag = "notes"
)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<ListNotesParams>,
) -> ApiResult<Json<NoteListResponse>> {
    Ok(Json(state.notes().list_notes(caller.identity(), params).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/notes/{id}",
    params(("id" = i64, Path, description = "노트 ID")),
    responses(
        (status = 200, description = "노트", body = NoteView),
        (status = 401, description = "비공개 노트, 인증 필요", body = ApiErrorResponse),
        (status = 403, description = "비공개 노트, 권한 없음", body = ApiErrorResponse),
        (status = 404, description = "없는 노트", body = ApiErrorResponse)
    ),
    tag = "notes"
)]
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<NoteView>> {
    Ok(Json(state.notes().get_note(caller.identity(), id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "작성 완료", body = NoteView),
        (status = 400, description = "필수 항목 누락", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    ),
    tag = "notes"
)]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteView>)> {
    let note = state.notes().create_note(caller.identity(), req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notes/{id}",
    params(("id" = i64, Path, description = "노트 ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "수정 완료", body = NoteView),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 404, description = "없는 노트", body = ApiErrorResponse)
    ),
    tag = "notes"
)]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<NoteView>> {
    Ok(Json(state.notes().update_note(caller.identity(), id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notes/{id}",
    params(("id" = i64, Path, description = "노트 ID")),
    responses(
        (status = 204, description = "삭제 완료"),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 404, description = "없는 노트", body = ApiErrorResponse)
    ),
    tag = "notes"
)]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.notes().delete_note(caller.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 노트 라우터 생성.
pub fn notes_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/{id}", get(get_note).patch(update_note).delete(delete_note))
}
