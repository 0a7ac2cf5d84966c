//! 첨부파일 모델과 입력 검증 규칙.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 파일명 최대 길이 (바이트).
pub const MAX_FILENAME_LEN: usize = 255;

/// 저장된 첨부파일.
///
/// `content`는 직렬화되지 않으며, 목록 조회 결과에서는 비어 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(skip, default)]
    pub content: Vec<u8>,
    pub author_id: i64,
    pub note_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 첨부파일 생성 입력.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub author_id: i64,
    pub note_id: Option<i64>,
}

/// 첨부파일 목록 조회 조건.
#[derive(Debug, Clone, Default)]
pub struct AttachmentQuery {
    pub note_id: Option<i64>,
    pub author_id: Option<i64>,
    pub limit: i64,
}

/// 업로드 파일명을 검증합니다.
///
/// 경로 구분자, `.`/`..`, 앞뒤 공백/마침표, 제어 문자를 거부합니다.
pub fn validate_filename(filename: &str) -> Result<(), &'static str> {
    if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
        return Err("filename must be between 1 and 255 bytes");
    }
    if filename.contains(['/', '\\']) {
        return Err("filename must not contain path separators");
    }
    if filename == "." || filename == ".." {
        return Err("filename must not be a relative path component");
    }
    if filename.starts_with([' ', '.']) || filename.ends_with([' ', '.']) {
        return Err("filename must not start or end with a space or dot");
    }
    if filename.chars().any(char::is_control) {
        return Err("filename must not contain control characters");
    }
    Ok(())
}

fn is_mime_token(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
}

/// MIME 타입이 `type/subtype` 토큰 문법을 따르는지 검증합니다.
pub fn validate_mime_type(mime_type: &str) -> Result<(), &'static str> {
    match mime_type.split_once('/') {
        Some((kind, subtype)) if is_mime_token(kind) && is_mime_token(subtype) => Ok(()),
        _ => Err("invalid MIME type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filenames() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename("사진 01.png").is_ok());
        assert!(validate_filename(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_invalid_filenames() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename(&"a".repeat(256)).is_err());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("dir\\file.txt").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename(".hidden").is_err());
        assert!(validate_filename("trailing.").is_err());
        assert!(validate_filename(" padded").is_err());
        assert!(validate_filename("bell\u{7}.txt").is_err());
    }

    #[test]
    fn test_mime_types() {
        assert!(validate_mime_type("image/png").is_ok());
        assert!(validate_mime_type("application/vnd.ms-excel").is_ok());
        assert!(validate_mime_type("image/svg+xml").is_ok());
        assert!(validate_mime_type("text").is_err());
        assert!(validate_mime_type("text/plain/extra").is_err());
        assert!(validate_mime_type("/plain").is_err());
        assert!(validate_mime_type("text/html; charset=utf-8").is_err());
    }
}
