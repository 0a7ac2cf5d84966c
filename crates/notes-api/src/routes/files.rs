//! 첨부파일 본문 다운로드.
//!
//! `GET /file/attachments/{id}/{filename}`
//!
//! 본문을 그대로 내려주므로 브라우저가 스크립트로 해석할 수 있는 형식은
//! `application/octet-stream`으로 바꾸고, 보안 헤더를 항상 붙입니다.
//! `video/*`, `audio/*`는 단일 `Range` 요청을 지원합니다.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{
            ACCEPT_RANGES, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
            CONTENT_SECURITY_POLICY, CONTENT_TYPE, RANGE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::auth::Caller;
use crate::error::{ApiErrorResponse, ApiResult, ServiceError};
use crate::state::AppState;

/// 스크립트 실행이 가능한 형식.
const ACTIVE_MIME_TYPES: &[&str] = &[
    "text/html",
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "text/xml",
    "application/xml",
    "application/xhtml+xml",
    "image/svg+xml",
];

const CACHE_POLICY: &str = "public, max-age=3600";
const CONTENT_POLICY: &str = "default-src 'none'; style-src 'unsafe-inline';";

/// 응답 `Content-Type` 결정.
///
/// 위험한 형식은 먼저 `application/octet-stream`으로 바꾸고, 남은 `text/*`에만 charset을 붙입니다.
pub fn sanitize_content_type(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() || ACTIVE_MIME_TYPES.contains(&essence.as_str()) {
        "application/octet-stream".to_string()
    } else if essence.starts_with("text/") {
        format!("{}; charset=utf-8", essence)
    } else {
        essence
    }
}

/// 브라우저에서 바로 보여줄 형식인지 확인.
pub fn is_inline(content_type: &str) -> bool {
    content_type.starts_with("image/")
        || content_type.starts_with("video/")
        || content_type.starts_with("audio/")
        || content_type == "application/pdf"
}

fn supports_range(content_type: &str) -> bool {
    content_type.starts_with("video/") || content_type.starts_with("audio/")
}

/// `Range` 헤더 해석 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// 헤더가 없거나 해석할 수 없으면 전체를 보냅니다.
    Full,
    /// 양 끝을 포함하는 구간.
    Partial { start: usize, end: usize },
    Unsatisfiable,
}

/// 단일 `bytes=` 구간만 해석합니다. 여러 구간 요청은 전체 응답으로 대신합니다.
pub fn parse_range(header: Option<&str>, len: usize) -> ByteRange {
    let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = ranges.split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        return match last.parse::<usize>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(suffix) => ByteRange::Partial {
                start: len.saturating_sub(suffix),
                end: len - 1,
            },
            Err(_) => ByteRange::Full,
        };
    }

    let Ok(start) = first.parse::<usize>() else {
        return ByteRange::Full;
    };
    if start >= len {
        return ByteRange::Unsatisfiable;
    }
    let end = if last.is_empty() {
        len - 1
    } else {
        match last.parse::<usize>() {
            Ok(end) if end >= start => end.min(len - 1),
            _ => return ByteRange::Full,
        }
    };

    ByteRange::Partial { start, end }
}

fn content_disposition(content_type: &str, filename: &str) -> ApiResult<HeaderValue> {
    let kind = if is_inline(content_type) {
        "inline"
    } else {
        "attachment"
    };
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");

    HeaderValue::from_bytes(format!("{}; filename=\"{}\"", kind, escaped).as_bytes())
        .map_err(|e| ServiceError::Internal(format!("invalid content-disposition: {}", e)))
}

fn header_value(value: String) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|e| ServiceError::Internal(format!("invalid header: {}", e)))
}

/// 첨부파일 본문 다운로드.
///
/// 첨부파일 읽기 규칙을 따릅니다: 노트에 연결되어 있으면 노트 읽기 권한, 아니면 작성자 본인만.
#[utoipa::path(
    get,
    path = "/file/attachments/{id}/{filename}",
    params(
        ("id" = i64, Path, description = "첨부파일 ID"),
        ("filename" = String, Path, description = "저장된 파일명")
    ),
    responses(
        (status = 200, description = "파일 본문"),
        (status = 206, description = "요청한 구간"),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 404, description = "없는 첨부파일 또는 파일명 불일치", body = ApiErrorResponse),
        (status = 416, description = "만족할 수 없는 구간")
    ),
    tag = "attachments"
)]
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((id, filename)): Path<(i64, String)>,
    request_headers: HeaderMap,
) -> ApiResult<Response> {
    let attachment = state
        .attachments()
        .read_file(caller.identity(), id, &filename)
        .await?;

    let content_type = sanitize_content_type(&attachment.mime_type);
    let len = attachment.content.len();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, header_value(content_type.clone())?);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_POLICY));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CONTENT_POLICY));
    headers.insert(
        CONTENT_DISPOSITION,
        content_disposition(&content_type, &attachment.filename)?,
    );

    if !supports_range(&content_type) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        return Ok((StatusCode::OK, headers, Body::from(attachment.content)).into_response());
    }

    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    let range = parse_range(
        request_headers.get(RANGE).and_then(|v| v.to_str().ok()),
        len,
    );

    match range {
        ByteRange::Full => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
            Ok((StatusCode::OK, headers, Body::from(attachment.content)).into_response())
        }
        ByteRange::Partial { start, end } => {
            let body = attachment.content[start..=end].to_vec();
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            headers.insert(
                CONTENT_RANGE,
                header_value(format!("bytes {}-{}/{}", start, end, len))?,
            );
            Ok((StatusCode::PARTIAL_CONTENT, headers, Body::from(body)).into_response())
        }
        ByteRange::Unsatisfiable => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(0usize));
            headers.insert(CONTENT_RANGE, header_value(format!("bytes */{}", len))?);
            Ok((StatusCode::RANGE_NOT_SATISFIABLE, headers, Body::empty()).into_response())
        }
    }
}

/// 파일 라우터 생성.
pub fn files_router() -> Router<Arc<AppState>> {
    Router::new().route("/attachments/{id}/{filename}", get(download_attachment))
}
