//! 태그 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 저장된 태그.
///
/// `note_count`는 노트-태그 연결에서 계산되며 직접 수정할 수 없습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub note_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 태그 생성 입력.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub description: String,
}

/// 태그 목록 조회 조건.
///
/// `note_count` 내림차순, 이름 오름차순으로 정렬합니다.
/// `limit`이 `None`이면 전체를 반환합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagQuery {
    pub limit: Option<i64>,
    pub offset: i64,
}
