//! 카테고리 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 저장된 카테고리.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub parent_id: Option<i64>,
    /// 정렬 순서 (오름차순)
    pub sort_order: i32,
    /// 목록 노출 여부
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 카테고리 생성 입력.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub parent_id: Option<i64>,
    pub sort_order: i32,
    pub visible: bool,
}

/// 카테고리 목록 조회 조건.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryQuery {
    pub include_hidden: bool,
    pub parent_id: Option<i64>,
}

impl CategoryQuery {
    pub fn matches(&self, category: &Category) -> bool {
        (self.include_hidden || category.visible)
            && self
                .parent_id
                .map_or(true, |parent| category.parent_id == Some(parent))
    }
}
