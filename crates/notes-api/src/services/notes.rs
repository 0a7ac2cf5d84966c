//! 노트 서비스.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use notes_core::{
    normalize_tag_ids, NewNote, Note, NoteOrder, NoteQuery, NoteSortField, ResourceKind, Store,
    Visibility,
};

use super::{non_empty, parse_reference, parse_references, Pagination};
use crate::auth::{authorize_mutation, authorize_read, Identity};
use crate::error::{ApiResult, ServiceError};

/// 목록 기본 페이지 크기.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// 목록 최대 페이지 크기.
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// 요청/응답 타입
// =============================================================================

/// 노트 목록 쿼리.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListNotesParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// 카테고리 참조 (`categories/{id}`)
    pub category: Option<String>,
    /// 태그 참조 (`tags/{id}`)
    pub tag: Option<String>,
    /// 제목 검색어
    pub search: Option<String>,
    /// 정렬 필드: `published_at`(기본), `created_at`, `updated_at`, `title`
    pub sort_by: Option<String>,
    /// 내림차순 여부 (기본 `true`)
    pub sort_desc: Option<bool>,
}

impl ListNotesParams {
    fn order(&self) -> ApiResult<NoteOrder> {
        let field = match self.sort_by.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => NoteSortField::default(),
            Some(name) => NoteSortField::parse(name).ok_or_else(|| {
                ServiceError::invalid(format!("unsupported sort field: {}", name))
            })?,
        };
        Ok(NoteOrder {
            field,
            descending: self.sort_desc.unwrap_or(true),
        })
    }
}

/// 노트 생성 요청.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub published: bool,
}

/// 노트 수정 요청.
///
/// 문자열 필드는 비어 있지 않을 때만 반영됩니다. `category: ""`는 카테고리를 해제합니다.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub published: Option<bool>,
}

/// 노트 응답.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteView {
    /// 리소스 이름 (`notes/{id}`)
    pub name: String,
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    /// 작성자 (`users/{id}`)
    pub author: String,
    pub author_id: i64,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        Self {
            name: ResourceKind::Note.name(note.id),
            id: note.id,
            title: note.title,
            summary: note.summary,
            content: note.content,
            author: ResourceKind::User.name(note.author_id),
            author_id: note.author_id,
            category: note.category_id.map(|id| ResourceKind::Category.name(id)),
            tags: note
                .tag_ids
                .iter()
                .map(|id| ResourceKind::Tag.name(*id))
                .collect(),
            visibility: note.visibility,
            published: note.published,
            published_at: note.published_at,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// 노트 목록 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteListResponse {
    pub notes: Vec<NoteView>,
    /// 호출자가 읽을 수 있는 노트 전체 개수
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

// =============================================================================
// 서비스
// =============================================================================

/// 노트 서비스.
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn Store>,
}

impl NoteService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 발행된 노트 중 호출자가 읽을 수 있는 것만 조회합니다. 기본 정렬은 최신 발행순입니다.
    pub async fn list_notes(
        &self,
        identity: Option<&Identity>,
        params: ListNotesParams,
    ) -> ApiResult<NoteListResponse> {
        let paging = Pagination::new(params.page, params.page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let query = NoteQuery {
            scope: Identity::read_scope(identity),
            category_id: parse_reference(ResourceKind::Category, params.category.as_deref())?,
            tag_id: parse_reference(ResourceKind::Tag, params.tag.as_deref())?,
            order: params.order()?,
            search: non_empty(params.search).map(|s| s.trim().to_string()),
            limit: paging.page_size,
            offset: paging.offset(),
        };

        let (notes, total) = self.store.list_notes(&query).await?;

        Ok(NoteListResponse {
            notes: notes.into_iter().map(NoteView::from).collect(),
            total,
            page: paging.page,
            page_size: paging.page_size,
            total_pages: paging.total_pages(total),
        })
    }

    pub async fn get_note(&self, identity: Option<&Identity>, id: i64) -> ApiResult<NoteView> {
        let note = self.find(id).await?;
        authorize_read(note.visibility, note.author_id, identity)?;
        Ok(note.into())
    }

    /// 노트 생성. 호출자가 작성자가 됩니다.
    pub async fn create_note(
        &self,
        identity: Option<&Identity>,
        req: CreateNoteRequest,
    ) -> ApiResult<NoteView> {
        let identity = identity.ok_or(ServiceError::AuthenticationRequired)?;

        let title = required(req.title, "title")?;
        let summary = required(req.summary, "summary")?;
        let content = required(req.content, "content")?;
        let category_id = self.resolve_category(req.category.as_deref()).await?;
        let tag_ids = self.resolve_tags(&req.tags).await?;

        let note = self
            .store
            .create_note(NewNote {
                title,
                content,
                summary,
                author_id: identity.user_id,
                category_id,
                tag_ids,
                visibility: req.visibility.unwrap_or_default(),
                published: req.published,
                published_at: req.published.then(Utc::now),
            })
            .await?;

        info!(note_id = note.id, author_id = note.author_id, "Note created");
        Ok(note.into())
    }

    /// 노트 수정. 작성자 또는 ADMIN/HOST.
    ///
    /// 미발행에서 발행으로 바뀔 때만 `published_at`을 현재 시각으로 설정합니다.
    pub async fn update_note(
        &self,
        identity: Option<&Identity>,
        id: i64,
        req: UpdateNoteRequest,
    ) -> ApiResult<NoteView> {
        let mut note = self.find(id).await?;
        authorize_mutation(note.author_id, identity)?;

        if let Some(title) = non_empty(req.title) {
            note.title = title;
        }
        if let Some(summary) = non_empty(req.summary) {
            note.summary = summary;
        }
        if let Some(content) = non_empty(req.content) {
            note.content = content;
        }
        if req.category.is_some() {
            note.category_id = self.resolve_category(req.category.as_deref()).await?;
        }
        if let Some(tags) = req.tags {
            note.tag_ids = self.resolve_tags(&tags).await?;
        }
        if let Some(visibility) = req.visibility {
            note.visibility = visibility;
        }
        if let Some(published) = req.published {
            if published && !note.published {
                note.published_at = Some(Utc::now());
            }
            note.published = published;
        }

        let updated = self.store.update_note(&note).await?;
        info!(note_id = updated.id, "Note updated");
        Ok(updated.into())
    }

    /// 노트 삭제. 첨부파일은 연결 해제 상태로 남습니다.
    pub async fn delete_note(&self, identity: Option<&Identity>, id: i64) -> ApiResult<()> {
        let note = self.find(id).await?;
        authorize_mutation(note.author_id, identity)?;

        self.store.delete_note(note.id).await?;
        info!(note_id = note.id, "Note deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> ApiResult<Note> {
        self.store
            .get_note(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("note not found: {}", ResourceKind::Note.name(id))))
    }

    async fn resolve_category(&self, reference: Option<&str>) -> ApiResult<Option<i64>> {
        let Some(category_id) = parse_reference(ResourceKind::Category, reference)? else {
            return Ok(None);
        };
        if self.store.get_category(category_id).await?.is_none() {
            return Err(ServiceError::invalid(format!(
                "category does not exist: {}",
                ResourceKind::Category.name(category_id)
            )));
        }
        Ok(Some(category_id))
    }

    async fn resolve_tags(&self, references: &[String]) -> ApiResult<Vec<i64>> {
        let tag_ids = normalize_tag_ids(parse_references(ResourceKind::Tag, references)?);
        for tag_id in &tag_ids {
            if self.store.get_tag(*tag_id).await?.is_none() {
                return Err(ServiceError::invalid(format!(
                    "tag does not exist: {}",
                    ResourceKind::Tag.name(*tag_id)
                )));
            }
        }
        Ok(tag_ids)
    }
}

fn required(value: String, field: &str) -> ApiResult<String> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid(format!("{} is required", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use notes_core::{NewTag, Role, TagStore};

    fn alice() -> Identity {
        Identity::new(1, "alice", Role::User)
    }

    fn bob() -> Identity {
        Identity::new(2, "bob", Role::User)
    }

    fn admin() -> Identity {
        Identity::new(99, "root", Role::Admin)
    }

    fn create_req(title: &str, visibility: Visibility, published: bool) -> CreateNoteRequest {
        CreateNoteRequest {
            title: title.to_string(),
            summary: "summary".to_string(),
            content: "content".to_string(),
            visibility: Some(visibility),
            published,
            ..Default::default()
        }
    }

    fn service() -> (NoteService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (NoteService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_requires_identity_and_fields() {
        let (svc, _) = service();

        let err = svc
            .create_note(None, create_req("t", Visibility::Public, true))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthenticationRequired));

        let mut missing = create_req("t", Visibility::Public, true);
        missing.summary = "  ".to_string();
        let err = svc.create_note(Some(&alice()), missing).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_private_note_hidden_from_stranger() {
        let (svc, _) = service();
        let note = svc
            .create_note(Some(&alice()), create_req("secret", Visibility::Private, true))
            .await
            .unwrap();

        assert!(matches!(
            svc.get_note(Some(&bob()), note.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            svc.get_note(None, note.id).await,
            Err(ServiceError::AuthenticationRequired)
        ));
        assert!(svc.get_note(Some(&alice()), note.id).await.is_ok());
        assert!(svc.get_note(Some(&admin()), note.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_sort_field() {
        let (svc, _) = service();
        let params = ListNotesParams {
            sort_by: Some("author_id".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.list_notes(None, params).await,
            Err(ServiceError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_note_is_not_found() {
        let (svc, _) = service();
        assert!(matches!(
            svc.get_note(None, 404).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_total_counts_only_readable() {
        let (svc, _) = service();
        svc.create_note(Some(&alice()), create_req("a", Visibility::Public, true))
            .await
            .unwrap();
        svc.create_note(Some(&alice()), create_req("b", Visibility::Private, true))
            .await
            .unwrap();
        svc.create_note(Some(&alice()), create_req("c", Visibility::Public, false))
            .await
            .unwrap();

        let anon = svc.list_notes(None, ListNotesParams::default()).await.unwrap();
        assert_eq!(anon.total, 1);
        assert_eq!(anon.total_pages, 1);

        let own = svc
            .list_notes(Some(&alice()), ListNotesParams::default())
            .await
            .unwrap();
        assert_eq!(own.total, 2);

        let stranger = svc
            .list_notes(Some(&bob()), ListNotesParams::default())
            .await
            .unwrap();
        assert_eq!(stranger.total, 1);

        let privileged = svc
            .list_notes(Some(&admin()), ListNotesParams::default())
            .await
            .unwrap();
        assert_eq!(privileged.total, 2);
    }

    #[tokio::test]
    async fn test_publish_stamps_once() {
        let (svc, _) = service();
        let draft = svc
            .create_note(Some(&alice()), create_req("draft", Visibility::Public, false))
            .await
            .unwrap();
        assert!(draft.published_at.is_none());

        let published = svc
            .update_note(
                Some(&alice()),
                draft.id,
                UpdateNoteRequest {
                    published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stamped = published.published_at.unwrap();

        let again = svc
            .update_note(
                Some(&alice()),
                draft.id,
                UpdateNoteRequest {
                    published: Some(true),
                    title: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again.published_at, Some(stamped));
        assert_eq!(again.title, "renamed");
    }

    #[tokio::test]
    async fn test_mutation_requires_ownership() {
        let (svc, _) = service();
        let note = svc
            .create_note(Some(&alice()), create_req("mine", Visibility::Public, true))
            .await
            .unwrap();

        assert!(matches!(
            svc.delete_note(Some(&bob()), note.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            svc.delete_note(None, note.id).await,
            Err(ServiceError::AuthenticationRequired)
        ));
        svc.delete_note(Some(&admin()), note.id).await.unwrap();
        assert!(matches!(
            svc.get_note(None, note.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_tags_and_category_references() {
        let (svc, store) = service();
        let tag = store
            .create_tag(NewTag {
                name: "rust".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        let mut req = create_req("tagged", Visibility::Public, true);
        req.tags = vec![format!("tags/{}", tag.id), format!("tags/{}", tag.id)];
        let note = svc.create_note(Some(&alice()), req).await.unwrap();
        assert_eq!(note.tags, vec![format!("tags/{}", tag.id)]);

        let mut bad_tag = create_req("x", Visibility::Public, true);
        bad_tag.tags = vec!["tags/999".to_string()];
        assert!(matches!(
            svc.create_note(Some(&alice()), bad_tag).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let mut bad_category = create_req("x", Visibility::Public, true);
        bad_category.category = Some("notes/1".to_string());
        assert!(matches!(
            svc.create_note(Some(&alice()), bad_category).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let filtered = svc
            .list_notes(
                None,
                ListNotesParams {
                    tag: Some(format!("tags/{}", tag.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.total, 1);
    }
}
