//! 카테고리 서비스.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use notes_core::{Category, CategoryQuery, NewCategory, ResourceKind, Store};

use super::{non_empty, parse_reference};
use crate::auth::Identity;
use crate::error::{ApiResult, ServiceError};

/// 목록 쿼리.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCategoriesParams {
    #[serde(default)]
    pub include_hidden: bool,
    /// 상위 카테고리 (`categories/{id}`)
    pub parent: Option<String>,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

/// 카테고리 수정 요청. `parent: ""`는 상위 카테고리를 해제합니다.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryView {
    /// 리소스 이름 (`categories/{id}`)
    pub name: String,
    pub id: i64,
    /// 표시 이름
    pub title: String,
    pub description: String,
    pub parent: Option<String>,
    pub sort_order: i32,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            name: ResourceKind::Category.name(category.id),
            id: category.id,
            title: category.name,
            description: category.description,
            parent: category.parent_id.map(|id| ResourceKind::Category.name(id)),
            sort_order: category.sort_order,
            visible: category.visible,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryView>,
    pub total: usize,
}

/// 카테고리 서비스.
#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_categories(&self, params: ListCategoriesParams) -> ApiResult<CategoryListResponse> {
        let query = CategoryQuery {
            include_hidden: params.include_hidden,
            parent_id: parse_reference(ResourceKind::Category, params.parent.as_deref())?,
        };
        let categories: Vec<CategoryView> = self
            .store
            .list_categories(query)
            .await?
            .into_iter()
            .map(CategoryView::from)
            .collect();

        Ok(CategoryListResponse {
            total: categories.len(),
            categories,
        })
    }

    pub async fn get_category(&self, id: i64) -> ApiResult<CategoryView> {
        Ok(self.find(id).await?.into())
    }

    pub async fn create_category(
        &self,
        identity: Option<&Identity>,
        req: CreateCategoryRequest,
    ) -> ApiResult<CategoryView> {
        identity.ok_or(ServiceError::AuthenticationRequired)?;

        let name = non_empty(Some(req.name)).ok_or_else(|| ServiceError::invalid("name is required"))?;
        let parent_id = self.resolve_parent(req.parent.as_deref(), None).await?;

        let category = self
            .store
            .create_category(NewCategory {
                name,
                description: req.description,
                parent_id,
                sort_order: req.sort_order,
                visible: req.visible,
            })
            .await?;

        info!(category_id = category.id, "Category created");
        Ok(category.into())
    }

    pub async fn update_category(
        &self,
        identity: Option<&Identity>,
        id: i64,
        req: UpdateCategoryRequest,
    ) -> ApiResult<CategoryView> {
        identity.ok_or(ServiceError::AuthenticationRequired)?;
        let mut category = self.find(id).await?;

        if let Some(name) = non_empty(req.name) {
            category.name = name;
        }
        if let Some(description) = req.description {
            category.description = description;
        }
        if req.parent.is_some() {
            category.parent_id = self.resolve_parent(req.parent.as_deref(), Some(category.id)).await?;
        }
        if let Some(sort_order) = req.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(visible) = req.visible {
            category.visible = visible;
        }

        let updated = self.store.update_category(&category).await?;
        info!(category_id = updated.id, "Category updated");
        Ok(updated.into())
    }

    /// 노트가 남아 있는 카테고리는 삭제할 수 없습니다 (409).
    pub async fn delete_category(&self, identity: Option<&Identity>, id: i64) -> ApiResult<()> {
        identity.ok_or(ServiceError::AuthenticationRequired)?;
        self.store.delete_category(id).await?;
        info!(category_id = id, "Category deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> ApiResult<Category> {
        self.store.get_category(id).await?.ok_or_else(|| {
            ServiceError::not_found(format!(
                "category not found: {}",
                ResourceKind::Category.name(id)
            ))
        })
    }

    async fn resolve_parent(&self, reference: Option<&str>, own_id: Option<i64>) -> ApiResult<Option<i64>> {
        let Some(parent_id) = parse_reference(ResourceKind::Category, reference)? else {
            return Ok(None);
        };
        if own_id == Some(parent_id) {
            return Err(ServiceError::invalid("category cannot be its own parent"));
        }
        if self.store.get_category(parent_id).await?.is_none() {
            return Err(ServiceError::invalid(format!(
                "parent category does not exist: {}",
                ResourceKind::Category.name(parent_id)
            )));
        }
        Ok(Some(parent_id))
    }
}
