//! 노트 모델.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReadScope, Visibility};

/// 저장된 노트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub author_id: i64,
    pub category_id: Option<i64>,
    /// 정렬/중복 제거된 태그 ID 목록
    pub tag_ids: Vec<i64>,
    pub visibility: Visibility,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 노트 생성 입력.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub visibility: Visibility,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// 노트 목록 정렬 기준 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteSortField {
    #[default]
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    Title,
}

impl NoteSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteSortField::PublishedAt => "published_at",
            NoteSortField::CreatedAt => "created_at",
            NoteSortField::UpdatedAt => "updated_at",
            NoteSortField::Title => "title",
        }
    }

    /// 허용된 필드 이름만 파싱합니다 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "published_at" => Some(NoteSortField::PublishedAt),
            "created_at" => Some(NoteSortField::CreatedAt),
            "updated_at" => Some(NoteSortField::UpdatedAt),
            "title" => Some(NoteSortField::Title),
            _ => None,
        }
    }
}

/// 노트 목록 정렬 순서. 같은 값끼리는 ID를 같은 방향으로 비교합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOrder {
    pub field: NoteSortField,
    pub descending: bool,
}

impl Default for NoteOrder {
    /// 최신 발행순
    fn default() -> Self {
        Self {
            field: NoteSortField::PublishedAt,
            descending: true,
        }
    }
}

impl NoteOrder {
    pub fn compare(&self, a: &Note, b: &Note) -> Ordering {
        let primary = match self.field {
            NoteSortField::PublishedAt => a.published_at.cmp(&b.published_at),
            NoteSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            NoteSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            NoteSortField::Title => a.title.cmp(&b.title),
        };
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// 노트 목록 조회 조건.
///
/// 발행된 노트 중 `scope`가 허용하는 노트만 대상으로 하며 `order`에 따라 정렬합니다.
#[derive(Debug, Clone)]
pub struct NoteQuery {
    pub scope: ReadScope,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    /// 제목 부분 일치 검색어 (와일드카드 없이 문자 그대로 비교)
    pub search: Option<String>,
    pub order: NoteOrder,
    pub limit: i64,
    pub offset: i64,
}

impl NoteQuery {
    /// 조회 조건에 노트가 포함되는지 확인 (페이지 범위 제외).
    pub fn matches(&self, note: &Note) -> bool {
        note.published
            && self.scope.permits(note.visibility, note.author_id)
            && self.category_id.map_or(true, |id| note.category_id == Some(id))
            && self.tag_id.map_or(true, |id| note.tag_ids.contains(&id))
            && self
                .search
                .as_deref()
                .map_or(true, |term| note.title.to_lowercase().contains(&term.to_lowercase()))
    }
}

/// 태그 ID 목록을 정렬하고 중복을 제거합니다.
pub fn normalize_tag_ids(mut tag_ids: Vec<i64>) -> Vec<i64> {
    tag_ids.sort_unstable();
    tag_ids.dedup();
    tag_ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(author_id: i64, visibility: Visibility, published: bool) -> Note {
        let now = Utc::now();
        Note {
            id: 1,
            title: "Rust Ownership Notes".to_string(),
            content: "body".to_string(),
            summary: "summary".to_string(),
            author_id,
            category_id: Some(3),
            tag_ids: vec![1, 2],
            visibility,
            published,
            published_at: published.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn query(scope: ReadScope) -> NoteQuery {
        NoteQuery {
            scope,
            category_id: None,
            tag_id: None,
            search: None,
            order: NoteOrder::default(),
            limit: 10,
            offset: 0,
        }
    }

    #[test]
    fn test_unpublished_never_listed() {
        let draft = note(1, Visibility::Public, false);
        assert!(!query(ReadScope::Everything).matches(&draft));
    }

    #[test]
    fn test_private_filtered_by_scope() {
        let private = note(1, Visibility::Private, true);
        assert!(!query(ReadScope::PublicOnly).matches(&private));
        assert!(!query(ReadScope::PublicAndOwn(2)).matches(&private));
        assert!(query(ReadScope::PublicAndOwn(1)).matches(&private));
    }

    #[test]
    fn test_filters() {
        let n = note(1, Visibility::Public, true);
        let mut q = query(ReadScope::PublicOnly);
        q.category_id = Some(3);
        q.tag_id = Some(2);
        q.search = Some("ownership".to_string());
        assert!(q.matches(&n));

        q.tag_id = Some(9);
        assert!(!q.matches(&n));
    }

    #[test]
    fn test_sort_field_allowlist() {
        assert_eq!(NoteSortField::parse("Title"), Some(NoteSortField::Title));
        assert_eq!(NoteSortField::parse(" created_at "), Some(NoteSortField::CreatedAt));
        assert_eq!(NoteSortField::parse("author_id"), None);
        assert_eq!(NoteSortField::parse("title; DROP TABLE notes"), None);
    }

    #[test]
    fn test_order_compare() {
        let mut a = note(1, Visibility::Public, true);
        let mut b = note(1, Visibility::Public, true);
        a.title = "alpha".to_string();
        b.title = "beta".to_string();
        b.id = 2;

        let asc = NoteOrder {
            field: NoteSortField::Title,
            descending: false,
        };
        assert_eq!(asc.compare(&a, &b), Ordering::Less);

        let desc = NoteOrder {
            descending: true,
            ..asc
        };
        assert_eq!(desc.compare(&a, &b), Ordering::Greater);

        // 같은 발행 시각이면 ID 순
        b.published_at = a.published_at;
        assert_eq!(NoteOrder::default().compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_normalize_tag_ids() {
        assert_eq!(normalize_tag_ids(vec![3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }
}
