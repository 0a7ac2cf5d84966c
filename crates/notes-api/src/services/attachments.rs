//! 첨부파일 서비스.
//!
//! 업로드(base64), 조회, 노트 연결 변경, 삭제를 담당합니다.
//! 읽기 권한은 연결된 노트의 공개 범위를 따르고, 연결되지 않은 첨부파일은 업로더만 읽을 수 있습니다.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use notes_core::{
    validate_filename, validate_mime_type, Attachment, AttachmentQuery, NewAttachment, Note,
    ResourceKind, Store,
};

use super::parse_reference;
use crate::auth::{authorize_attachment_read, authorize_mutation, authorize_read, AttachmentLink, Identity};
use crate::error::{ApiResult, ServiceError};

/// 목록 기본 개수.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// 목록 최대 개수.
pub const MAX_PAGE_SIZE: i64 = 1000;

// =============================================================================
// 요청/응답 타입
// =============================================================================

/// 업로드 요청.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateAttachmentRequest {
    pub filename: String,
    /// MIME 타입 (`type/subtype`)
    #[serde(alias = "type")]
    pub mime_type: String,
    /// base64 인코딩된 본문
    pub content: String,
    /// 연결할 노트 (`notes/{id}`)
    #[serde(default)]
    pub note: Option<String>,
}

/// 목록 쿼리.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAttachmentsParams {
    pub note: Option<String>,
    pub page_size: Option<i64>,
}

/// 연결 변경 요청. `note`가 빈 문자열이면 연결 해제.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAttachmentRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// 첨부파일 응답 (본문 제외).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentView {
    /// 리소스 이름 (`attachments/{id}`)
    pub name: String,
    pub id: i64,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    /// 업로더 (`users/{id}`)
    pub author: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentView {
    fn from(attachment: Attachment) -> Self {
        Self {
            name: ResourceKind::Attachment.name(attachment.id),
            id: attachment.id,
            filename: attachment.filename,
            mime_type: attachment.mime_type,
            size: attachment.size,
            author: ResourceKind::User.name(attachment.author_id),
            note: attachment.note_id.map(|id| ResourceKind::Note.name(id)),
            created_at: attachment.created_at,
            updated_at: attachment.updated_at,
        }
    }
}

/// 목록 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttachmentListResponse {
    pub attachments: Vec<AttachmentView>,
    pub total: usize,
}

// =============================================================================
// 서비스
// =============================================================================

/// 첨부파일 서비스.
#[derive(Clone)]
pub struct AttachmentService {
    store: Arc<dyn Store>,
    max_bytes: usize,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn Store>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    /// 업로드. 노트에 연결하려면 그 노트의 수정 권한이 필요합니다.
    pub async fn create_attachment(
        &self,
        identity: Option<&Identity>,
        req: CreateAttachmentRequest,
    ) -> ApiResult<AttachmentView> {
        let identity = identity.ok_or(ServiceError::AuthenticationRequired)?;

        validate_filename(&req.filename).map_err(ServiceError::invalid)?;
        validate_mime_type(&req.mime_type).map_err(ServiceError::invalid)?;

        let content = STANDARD
            .decode(req.content.trim())
            .map_err(|_| ServiceError::invalid("content must be valid base64"))?;
        if content.is_empty() {
            return Err(ServiceError::invalid("content must not be empty"));
        }
        if content.len() > self.max_bytes {
            return Err(ServiceError::invalid(format!(
                "attachment exceeds maximum size of {} bytes",
                self.max_bytes
            )));
        }

        let note_id = match parse_reference(ResourceKind::Note, req.note.as_deref())? {
            Some(note_id) => {
                let note = self.find_note(note_id).await?;
                authorize_mutation(note.author_id, Some(identity))?;
                Some(note.id)
            }
            None => None,
        };

        let attachment = self
            .store
            .create_attachment(NewAttachment {
                filename: req.filename,
                mime_type: req.mime_type,
                content,
                author_id: identity.user_id,
                note_id,
            })
            .await?;

        info!(
            attachment_id = attachment.id,
            author_id = attachment.author_id,
            size = attachment.size,
            "Attachment uploaded"
        );
        Ok(attachment.into())
    }

    /// 목록 조회.
    ///
    /// `note`가 주어지면 그 노트를 읽을 수 있어야 하고, 없으면 호출자 본인의 첨부파일을 반환합니다.
    pub async fn list_attachments(
        &self,
        identity: Option<&Identity>,
        params: ListAttachmentsParams,
    ) -> ApiResult<AttachmentListResponse> {
        let limit = match params.page_size {
            Some(size) if size >= 1 => size.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };

        let query = match parse_reference(ResourceKind::Note, params.note.as_deref())? {
            Some(note_id) => {
                let note = self.find_note(note_id).await?;
                authorize_read(note.visibility, note.author_id, identity)?;
                AttachmentQuery {
                    note_id: Some(note.id),
                    author_id: None,
                    limit,
                }
            }
            None => {
                let identity = identity.ok_or(ServiceError::AuthenticationRequired)?;
                AttachmentQuery {
                    note_id: None,
                    author_id: Some(identity.user_id),
                    limit,
                }
            }
        };

        let attachments: Vec<AttachmentView> = self
            .store
            .list_attachments(&query)
            .await?
            .into_iter()
            .map(AttachmentView::from)
            .collect();

        Ok(AttachmentListResponse {
            total: attachments.len(),
            attachments,
        })
    }

    pub async fn get_attachment(&self, identity: Option<&Identity>, id: i64) -> ApiResult<AttachmentView> {
        let attachment = self.find(id).await?;
        self.authorize_read(&attachment, identity).await?;
        Ok(attachment.into())
    }

    /// 파일 다운로드용 조회. 본문을 포함합니다.
    ///
    /// 경로의 파일명이 저장된 이름과 다르면 없는 것으로 처리합니다.
    pub async fn read_file(
        &self,
        identity: Option<&Identity>,
        id: i64,
        filename: &str,
    ) -> ApiResult<Attachment> {
        let attachment = self.find(id).await?;
        if attachment.filename != filename {
            return Err(ServiceError::not_found(format!(
                "attachment not found: {}/{}",
                ResourceKind::Attachment.name(id),
                filename
            )));
        }
        self.authorize_read(&attachment, identity).await?;
        Ok(attachment)
    }

    /// 노트 연결 변경.
    pub async fn update_attachment(
        &self,
        identity: Option<&Identity>,
        id: i64,
        req: UpdateAttachmentRequest,
    ) -> ApiResult<AttachmentView> {
        let attachment = self.find(id).await?;
        authorize_mutation(attachment.author_id, identity)?;

        let Some(reference) = req.note else {
            return Ok(attachment.into());
        };

        let note_id = match parse_reference(ResourceKind::Note, Some(&reference))? {
            Some(note_id) => {
                let note = self.find_note(note_id).await?;
                authorize_mutation(note.author_id, identity)?;
                Some(note.id)
            }
            None => None,
        };

        let updated = self.store.set_attachment_note(attachment.id, note_id).await?;
        info!(attachment_id = updated.id, note_id = ?updated.note_id, "Attachment link updated");
        Ok(updated.into())
    }

    pub async fn delete_attachment(&self, identity: Option<&Identity>, id: i64) -> ApiResult<()> {
        let attachment = self.find(id).await?;
        authorize_mutation(attachment.author_id, identity)?;

        self.store.delete_attachment(attachment.id).await?;
        info!(attachment_id = attachment.id, "Attachment deleted");
        Ok(())
    }

    async fn authorize_read(&self, attachment: &Attachment, identity: Option<&Identity>) -> ApiResult<()> {
        let link = self.link_of(attachment).await?;
        authorize_attachment_read(attachment.author_id, link, identity)?;
        Ok(())
    }

    /// 연결된 노트가 삭제되어 없으면 연결되지 않은 것으로 봅니다.
    async fn link_of(&self, attachment: &Attachment) -> ApiResult<AttachmentLink> {
        let Some(note_id) = attachment.note_id else {
            return Ok(AttachmentLink::Unlinked);
        };
        Ok(match self.store.get_note(note_id).await? {
            Some(note) => AttachmentLink::Note {
                visibility: note.visibility,
                author_id: note.author_id,
            },
            None => AttachmentLink::Unlinked,
        })
    }

    async fn find(&self, id: i64) -> ApiResult<Attachment> {
        self.store.get_attachment(id).await?.ok_or_else(|| {
            ServiceError::not_found(format!(
                "attachment not found: {}",
                ResourceKind::Attachment.name(id)
            ))
        })
    }

    async fn find_note(&self, id: i64) -> ApiResult<Note> {
        self.store
            .get_note(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("note not found: {}", ResourceKind::Note.name(id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use notes_core::{NewNote, NoteStore, Role, Visibility};

    fn alice() -> Identity {
        Identity::new(1, "alice", Role::User)
    }

    fn bob() -> Identity {
        Identity::new(2, "bob", Role::User)
    }

    fn admin() -> Identity {
        Identity::new(99, "root", Role::Admin)
    }

    fn upload(filename: &str, note: Option<String>) -> CreateAttachmentRequest {
        CreateAttachmentRequest {
            filename: filename.to_string(),
            mime_type: "text/plain".to_string(),
            content: STANDARD.encode(b"hello world"),
            note,
        }
    }

    async fn setup() -> (AttachmentService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AttachmentService::new(store.clone(), 1024), store)
    }

    async fn note(store: &MemoryStore, author_id: i64, visibility: Visibility) -> Note {
        store
            .create_note(NewNote {
                title: "t".to_string(),
                content: "c".to_string(),
                summary: "s".to_string(),
                author_id,
                category_id: None,
                tag_ids: vec![],
                visibility,
                published: true,
                published_at: Some(Utc::now()),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let (svc, _) = setup().await;

        assert!(matches!(
            svc.create_attachment(None, upload("a.txt", None)).await,
            Err(ServiceError::AuthenticationRequired)
        ));
        assert!(matches!(
            svc.create_attachment(Some(&alice()), upload("../etc/passwd", None)).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let mut bad_mime = upload("a.txt", None);
        bad_mime.mime_type = "text".to_string();
        assert!(matches!(
            svc.create_attachment(Some(&alice()), bad_mime).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let mut empty = upload("a.txt", None);
        empty.content = String::new();
        assert!(matches!(
            svc.create_attachment(Some(&alice()), empty).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let mut too_big = upload("a.txt", None);
        too_big.content = STANDARD.encode(vec![0u8; 2048]);
        assert!(matches!(
            svc.create_attachment(Some(&alice()), too_big).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let ok = svc
            .create_attachment(Some(&alice()), upload("a.txt", None))
            .await
            .unwrap();
        assert_eq!(ok.size, 11);
        assert_eq!(ok.note, None);
    }

    #[tokio::test]
    async fn test_unlinked_attachment_author_only() {
        let (svc, _) = setup().await;
        let att = svc
            .create_attachment(Some(&alice()), upload("a.txt", None))
            .await
            .unwrap();

        assert!(svc.get_attachment(Some(&alice()), att.id).await.is_ok());
        assert!(matches!(
            svc.get_attachment(Some(&bob()), att.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        // 연결되지 않은 첨부파일에는 특권 역할 우회가 없음
        assert!(matches!(
            svc.get_attachment(Some(&admin()), att.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            svc.get_attachment(None, att.id).await,
            Err(ServiceError::AuthenticationRequired)
        ));
    }

    #[tokio::test]
    async fn test_linked_attachment_follows_note() {
        let (svc, store) = setup().await;
        let private = note(&store, 1, Visibility::Private).await;
        let public = note(&store, 1, Visibility::Public).await;

        let hidden = svc
            .create_attachment(Some(&alice()), upload("p.txt", Some(format!("notes/{}", private.id))))
            .await
            .unwrap();
        let shown = svc
            .create_attachment(Some(&alice()), upload("q.txt", Some(format!("notes/{}", public.id))))
            .await
            .unwrap();

        assert!(svc.get_attachment(None, shown.id).await.is_ok());
        assert!(matches!(
            svc.get_attachment(Some(&bob()), hidden.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(svc.get_attachment(Some(&admin()), hidden.id).await.is_ok());

        let list = svc
            .list_attachments(
                None,
                ListAttachmentsParams {
                    note: Some(format!("notes/{}", public.id)),
                    page_size: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(list.total, 1);

        assert!(matches!(
            svc.list_attachments(
                None,
                ListAttachmentsParams {
                    note: Some(format!("notes/{}", private.id)),
                    page_size: None,
                },
            )
            .await,
            Err(ServiceError::AuthenticationRequired)
        ));
    }

    #[tokio::test]
    async fn test_linking_requires_note_mutation_right() {
        let (svc, store) = setup().await;
        let alices_note = note(&store, 1, Visibility::Public).await;

        let err = svc
            .create_attachment(Some(&bob()), upload("b.txt", Some(format!("notes/{}", alices_note.id))))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let bobs = svc
            .create_attachment(Some(&bob()), upload("b.txt", None))
            .await
            .unwrap();
        let err = svc
            .update_attachment(
                Some(&bob()),
                bobs.id,
                UpdateAttachmentRequest {
                    note: Some(format!("notes/{}", alices_note.id)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let err = svc
            .update_attachment(
                Some(&bob()),
                bobs.id,
                UpdateAttachmentRequest {
                    note: Some("notes/12345".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_relink_and_unlink() {
        let (svc, store) = setup().await;
        let own = note(&store, 1, Visibility::Public).await;
        let att = svc
            .create_attachment(Some(&alice()), upload("a.txt", None))
            .await
            .unwrap();

        let linked = svc
            .update_attachment(
                Some(&alice()),
                att.id,
                UpdateAttachmentRequest {
                    note: Some(format!("notes/{}", own.id)),
                },
            )
            .await
            .unwrap();
        assert_eq!(linked.note, Some(format!("notes/{}", own.id)));

        let unlinked = svc
            .update_attachment(
                Some(&alice()),
                att.id,
                UpdateAttachmentRequest {
                    note: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(unlinked.note, None);
    }

    #[tokio::test]
    async fn test_read_file_checks_filename() {
        let (svc, _) = setup().await;
        let att = svc
            .create_attachment(Some(&alice()), upload("a.txt", None))
            .await
            .unwrap();

        let file = svc.read_file(Some(&alice()), att.id, "a.txt").await.unwrap();
        assert_eq!(file.content, b"hello world");
        assert!(matches!(
            svc.read_file(Some(&alice()), att.id, "b.txt").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let (svc, _) = setup().await;
        let att = svc
            .create_attachment(Some(&alice()), upload("a.txt", None))
            .await
            .unwrap();

        assert!(matches!(
            svc.delete_attachment(Some(&bob()), att.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        svc.delete_attachment(Some(&admin()), att.id).await.unwrap();
        assert!(matches!(
            svc.get_attachment(Some(&alice()), att.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
