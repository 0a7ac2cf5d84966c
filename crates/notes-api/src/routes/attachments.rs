//! 첨부파일 API 라우트.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/attachments` - 목록 (`note` 지정 시 그 노트의 첨부파일, 없으면 본인 것)
//! - `POST /api/v1/attachments` - 업로드 (base64 본문)
//! - `GET /api/v1/attachments/{id}` - 메타데이터 조회
//! - `PATCH /api/v1/attachments/{id}` - 노트 연결 변경
//! - `DELETE /api/v1/attachments/{id}` - 삭제
//!
//! 파일 본문은 [`super::files`]의 `/file/attachments/{id}/{filename}`에서 내려받습니다.

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::auth::Caller;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::metrics::record_attachment_upload;
use crate::services::{
    AttachmentListResponse, AttachmentView, CreateAttachmentRequest, ListAttachmentsParams,
    UpdateAttachmentRequest,
};
use crate::state::AppState;

/// JSON 필드와 그 밖의 요청 본문 여유분.
const REQUEST_OVERHEAD_BYTES: usize = 64 * 1024;

/// base64 인코딩된 첨부파일을 받을 수 있는 요청 본문 크기.
pub fn upload_body_limit(max_attachment_bytes: usize) -> usize {
    max_attachment_bytes.div_ceil(3) * 4 + REQUEST_OVERHEAD_BYTES
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments",
    params(ListAttachmentsParams),
    responses(
        (status = 200, description = "첨부파일 목록", body = AttachmentListResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 404, description = "없는 노트", body = ApiErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn list_attachments(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<ListAttachmentsParams>,
) -> ApiResult<Json<AttachmentListResponse>> {
    Ok(Json(
        state.attachments().list_attachments(caller.identity(), params).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/attachments",
    request_body = CreateAttachmentRequest,
    responses(
        (status = 201, description = "업로드 완료", body = AttachmentView),
        (status = 400, description = "파일명/형식/크기 오류", body = ApiErrorResponse),
        (status = 403, description = "노트 수정 권한 없음", body = ApiErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn create_attachment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateAttachmentRequest>,
) -> ApiResult<(StatusCode, Json<AttachmentView>)> {
    let attachment = state
        .attachments()
        .create_attachment(caller.identity(), req)
        .await?;
    record_attachment_upload(attachment.size.max(0) as usize);
    Ok((StatusCode::CREATED, Json(attachment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments/{id}",
    params(("id" = i64, Path, description = "첨부파일 ID")),
    responses(
        (status = 200, description = "첨부파일", body = AttachmentView),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 404, description = "없는 첨부파일", body = ApiErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn get_attachment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<AttachmentView>> {
    Ok(Json(state.attachments().get_attachment(caller.identity(), id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/attachments/{id}",
    params(("id" = i64, Path, description = "첨부파일 ID")),
    request_body = UpdateAttachmentRequest,
    responses(
        (status = 200, description = "연결 변경 완료", body = AttachmentView),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn update_attachment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAttachmentRequest>,
) -> ApiResult<Json<AttachmentView>> {
    Ok(Json(
        state
            .attachments()
            .update_attachment(caller.identity(), id, req)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attachments/{id}",
    params(("id" = i64, Path, description = "첨부파일 ID")),
    responses(
        (status = 204, description = "삭제 완료"),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.attachments().delete_attachment(caller.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 첨부파일 라우터 생성.
///
/// 업로드 본문은 axum 기본 제한(2MB)보다 크므로 최대 첨부파일 크기에 맞춰 제한을 늘립니다.
pub fn attachments_router(max_attachment_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_attachments).post(create_attachment))
        .route(
            "/{id}",
            get(get_attachment)
                .patch(update_attachment)
                .delete(delete_attachment),
        )
        .layer(DefaultBodyLimit::max(upload_body_limit(max_attachment_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_body_limit_covers_base64() {
        let max: usize = 32 << 20;
        let encoded_len = max.div_ceil(3) * 4;
        assert!(upload_body_limit(max) > encoded_len);
        assert_eq!(upload_body_limit(3), 4 + REQUEST_OVERHEAD_BYTES);
    }
}
