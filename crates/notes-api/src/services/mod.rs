//! 리소스 서비스.
//!
//! 각 서비스는 저장소 호출과 권한 평가를 조합합니다. 호출자 신원은 전역 상태가 아니라
//! 모든 연산의 `Option<&Identity>` 인자로 명시적으로 전달됩니다.

pub mod attachments;
pub mod categories;
pub mod notes;
pub mod tags;
pub mod users;

pub use attachments::{
    AttachmentListResponse, AttachmentService, AttachmentView, CreateAttachmentRequest,
    ListAttachmentsParams, UpdateAttachmentRequest,
};
pub use categories::{
    CategoryListResponse, CategoryService, CategoryView, CreateCategoryRequest,
    ListCategoriesParams, UpdateCategoryRequest,
};
pub use notes::{
    CreateNoteRequest, ListNotesParams, NoteListResponse, NoteService, NoteView, UpdateNoteRequest,
};
pub use tags::{CreateTagRequest, ListTagsParams, TagListResponse, TagService, TagView, UpdateTagRequest};
pub use users::{
    LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, UserListResponse,
    UserService, UserView,
};

use notes_core::ResourceKind;

use crate::error::ApiResult;

// =============================================================================
// 공통 헬퍼
// =============================================================================

/// 선택적 리소스 참조(`"notes/42"`)를 ID로 변환합니다.
///
/// 값이 없거나 빈 문자열이면 `None`입니다.
pub(crate) fn parse_reference(kind: ResourceKind, value: Option<&str>) -> ApiResult<Option<i64>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => Ok(Some(kind.parse_id(name)?)),
    }
}

/// 리소스 참조 목록을 ID 목록으로 변환합니다.
pub(crate) fn parse_references(kind: ResourceKind, values: &[String]) -> ApiResult<Vec<i64>> {
    values
        .iter()
        .map(|name| kind.parse_id(name.trim()).map_err(Into::into))
        .collect()
}

/// 공백이 아닌 값만 남깁니다.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 페이지 번호/크기 정규화.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    /// 페이지는 1 미만이면 1, 크기는 1 미만이면 `default_size`, `max_size` 초과면 `max_size`.
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: i64, max_size: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = match page_size {
            Some(size) if size >= 1 => size.min(max_size),
            _ => default_size,
        };
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// `ceil(total / page_size)`, 결과가 없어도 최소 1.
    pub fn total_pages(&self, total: i64) -> i64 {
        ((total + self.page_size - 1) / self.page_size).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamp() {
        let p = Pagination::new(None, None, 10, 100);
        assert_eq!((p.page, p.page_size, p.offset()), (1, 10, 0));

        let p = Pagination::new(Some(0), Some(500), 10, 100);
        assert_eq!((p.page, p.page_size), (1, 100));

        let p = Pagination::new(Some(3), Some(-5), 10, 100);
        assert_eq!((p.page, p.page_size, p.offset()), (3, 10, 20));
    }

    #[test]
    fn test_total_pages() {
        let p = Pagination::new(Some(1), Some(10), 10, 100);
        assert_eq!(p.total_pages(0), 1);
        assert_eq!(p.total_pages(1), 1);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference(ResourceKind::Note, None).unwrap(), None);
        assert_eq!(parse_reference(ResourceKind::Note, Some("")).unwrap(), None);
        assert_eq!(parse_reference(ResourceKind::Note, Some("notes/7")).unwrap(), Some(7));
        assert!(parse_reference(ResourceKind::Note, Some("tags/7")).is_err());
        assert!(parse_reference(ResourceKind::Note, Some("notes/0")).is_err());
    }

    #[test]
    fn test_parse_references() {
        let names = vec!["tags/1".to_string(), " tags/3 ".to_string()];
        assert_eq!(parse_references(ResourceKind::Tag, &names).unwrap(), vec![1, 3]);
        assert!(parse_references(ResourceKind::Tag, &["notes/1".to_string()]).is_err());
    }
}
