//! 태그 서비스.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use notes_core::{NewTag, ResourceKind, Store, Tag, TagQuery};

use super::non_empty;
use crate::auth::Identity;
use crate::error::{ApiResult, ServiceError};

/// 목록 쿼리. `limit`이 없으면 전체를 반환합니다.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTagsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagView {
    /// 리소스 이름 (`tags/{id}`)
    pub name: String,
    pub id: i64,
    /// 표시 이름
    pub title: String,
    pub description: String,
    /// 이 태그가 달린 노트 수
    pub note_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self {
            name: ResourceKind::Tag.name(tag.id),
            id: tag.id,
            title: tag.name,
            description: tag.description,
            note_count: tag.note_count,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TagListResponse {
    pub tags: Vec<TagView>,
    pub total: i64,
}

/// 태그 서비스.
#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn Store>,
}

impl TagService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 노트 수 내림차순, 이름 오름차순.
    pub async fn list_tags(&self, params: ListTagsParams) -> ApiResult<TagListResponse> {
        let query = TagQuery {
            limit: params.limit.filter(|l| *l > 0),
            offset: params.offset.filter(|o| *o > 0).unwrap_or(0),
        };
        let (tags, total) = self.store.list_tags(query).await?;

        Ok(TagListResponse {
            tags: tags.into_iter().map(TagView::from).collect(),
            total,
        })
    }

    pub async fn get_tag(&self, id: i64) -> ApiResult<TagView> {
        Ok(self.find(id).await?.into())
    }

    /// 이름이 중복되면 409.
    pub async fn create_tag(&self, identity: Option<&Identity>, req: CreateTagRequest) -> ApiResult<TagView> {
        identity.ok_or(ServiceError::AuthenticationRequired)?;
        let name = non_empty(Some(req.name)).ok_or_else(|| ServiceError::invalid("name is required"))?;

        let tag = self
            .store
            .create_tag(NewTag {
                name,
                description: req.description,
            })
            .await?;

        info!(tag_id = tag.id, name = %tag.name, "Tag created");
        Ok(tag.into())
    }

    pub async fn update_tag(
        &self,
        identity: Option<&Identity>,
        id: i64,
        req: UpdateTagRequest,
    ) -> ApiResult<TagView> {
        identity.ok_or(ServiceError::AuthenticationRequired)?;
        let mut tag = self.find(id).await?;

        if let Some(name) = non_empty(req.name) {
            tag.name = name;
        }
        if let Some(description) = req.description {
            tag.description = description;
        }

        let updated = self.store.update_tag(&tag).await?;
        info!(tag_id = updated.id, "Tag updated");
        Ok(updated.into())
    }

    /// 노트에 달려 있는 태그는 삭제할 수 없습니다 (409).
    pub async fn delete_tag(&self, identity: Option<&Identity>, id: i64) -> ApiResult<()> {
        identity.ok_or(ServiceError::AuthenticationRequired)?;
        self.store.delete_tag(id).await?;
        info!(tag_id = id, "Tag deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> ApiResult<Tag> {
        self.store
            .get_tag(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("tag not found: {}", ResourceKind::Tag.name(id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use notes_core::Role;

    fn user() -> Identity {
        Identity::new(1, "alice", Role::User)
    }

    fn create_req(name: &str) -> CreateTagRequest {
        CreateTagRequest {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let svc = TagService::new(Arc::new(MemoryStore::new()));
        svc.create_tag(Some(&user()), create_req("rust")).await.unwrap();
        assert!(matches!(
            svc.create_tag(Some(&user()), create_req("rust")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_paging_and_total() {
        let svc = TagService::new(Arc::new(MemoryStore::new()));
        for name in ["c", "a", "b"] {
            svc.create_tag(Some(&user()), create_req(name)).await.unwrap();
        }

        let page = svc
            .list_tags(ListTagsParams {
                limit: Some(2),
                offset: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let titles: Vec<_> = page.tags.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_mutations_require_identity() {
        let svc = TagService::new(Arc::new(MemoryStore::new()));
        let tag = svc.create_tag(Some(&user()), create_req("rust")).await.unwrap();

        assert!(matches!(
            svc.create_tag(None, create_req("x")).await,
            Err(ServiceError::AuthenticationRequired)
        ));
        assert!(matches!(
            svc.delete_tag(None, tag.id).await,
            Err(ServiceError::AuthenticationRequired)
        ));

        let renamed = svc
            .update_tag(
                Some(&user()),
                tag.id,
                UpdateTagRequest {
                    name: Some("rustlang".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "rustlang");
        assert!(matches!(svc.get_tag(9999).await, Err(ServiceError::NotFound(_))));
    }
}
