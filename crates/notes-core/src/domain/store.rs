//! 저장소 추상화.
//!
//! 서비스 계층은 구체적인 DB를 알지 못하고 이 trait들만 사용합니다.
//! PostgreSQL 구현과 메모리 구현은 API 크레이트의 `repository` 모듈에 있습니다.

use async_trait::async_trait;
use thiserror::Error;

use super::{
    Attachment, AttachmentQuery, Category, CategoryQuery, NewAttachment, NewCategory, NewNote,
    NewTag, NewUser, Note, NoteQuery, Tag, TagQuery, User,
};

// =============================================================================
// 에러 타입
// =============================================================================

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 대상 레코드 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 유일성/참조 제약 위반
    #[error("충돌: {0}")]
    Conflict(String),

    /// 백엔드 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// 리소스별 저장소 Trait
// =============================================================================

/// 사용자 저장소.
///
/// 모든 조회는 소프트 삭제된 사용자를 제외합니다.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 사용자 생성.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict`: 이미 사용 중인 사용자명
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// 가입 순서(ID 오름차순)로 사용자 목록 조회.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// 프로필/역할/비밀번호 해시를 저장하고 `updated_at`을 갱신합니다.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound`: 없는 사용자
    /// - `StoreError::Conflict`: 다른 사용자가 사용 중인 사용자명
    async fn update_user(&self, user: &User) -> StoreResult<User>;

    /// 소프트 삭제.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;

    /// 삭제되지 않은 사용자 수.
    async fn count_users(&self) -> StoreResult<i64>;
}

/// 노트 저장소.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// 조건에 맞는 노트 한 페이지와 전체 개수를 반환합니다.
    async fn list_notes(&self, query: &NoteQuery) -> StoreResult<(Vec<Note>, i64)>;

    async fn get_note(&self, id: i64) -> StoreResult<Option<Note>>;

    async fn create_note(&self, note: NewNote) -> StoreResult<Note>;

    /// 본문/메타데이터/태그 연결을 저장하고 `updated_at`을 갱신합니다.
    async fn update_note(&self, note: &Note) -> StoreResult<Note>;

    /// 노트 삭제.
    ///
    /// 태그 연결을 제거하고, 연결된 첨부파일은 연결 해제 상태로 남깁니다.
    async fn delete_note(&self, id: i64) -> StoreResult<()>;
}

/// 첨부파일 저장소.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn create_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment>;

    /// 본문(`content`)을 포함한 단건 조회.
    async fn get_attachment(&self, id: i64) -> StoreResult<Option<Attachment>>;

    /// 본문을 제외한 목록 조회 (생성 시각 내림차순).
    async fn list_attachments(&self, query: &AttachmentQuery) -> StoreResult<Vec<Attachment>>;

    /// 노트 연결 변경. `None`이면 연결 해제.
    async fn set_attachment_note(&self, id: i64, note_id: Option<i64>) -> StoreResult<Attachment>;

    async fn delete_attachment(&self, id: i64) -> StoreResult<()>;
}

/// 카테고리 저장소.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// `sort_order` 오름차순, 생성 시각 내림차순으로 정렬된 목록.
    async fn list_categories(&self, query: CategoryQuery) -> StoreResult<Vec<Category>>;

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>>;

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;

    async fn update_category(&self, category: &Category) -> StoreResult<Category>;

    /// 카테고리 삭제.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict`: 이 카테고리를 사용하는 노트가 있음
    async fn delete_category(&self, id: i64) -> StoreResult<()>;
}

/// 태그 저장소.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// 태그 한 페이지와 전체 개수를 반환합니다.
    async fn list_tags(&self, query: TagQuery) -> StoreResult<(Vec<Tag>, i64)>;

    async fn get_tag(&self, id: i64) -> StoreResult<Option<Tag>>;

    /// # Errors
    ///
    /// - `StoreError::Conflict`: 같은 이름의 태그가 있음
    async fn create_tag(&self, tag: NewTag) -> StoreResult<Tag>;

    async fn update_tag(&self, tag: &Tag) -> StoreResult<Tag>;

    /// 태그 삭제.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict`: 이 태그가 달린 노트가 있음
    async fn delete_tag(&self, id: i64) -> StoreResult<()>;
}

// =============================================================================
// 통합 Store Trait
// =============================================================================

/// 서비스가 사용하는 전체 저장소.
#[async_trait]
pub trait Store: UserStore + NoteStore + AttachmentStore + CategoryStore + TagStore {
    /// 백엔드 이름 (로깅/헬스체크용).
    fn backend(&self) -> &'static str;

    /// 백엔드 연결 확인.
    async fn ping(&self) -> StoreResult<()>;
}
