//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 `Arc`로 래핑되어 Axum의 State extractor를 통해 핸들러에 주입됩니다.
//! 저장소는 `Arc<dyn Store>`로 보관하므로 PostgreSQL과 인메모리 구현을 바꿔 끼울 수 있습니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use notes_core::{Store, DEFAULT_MAX_ATTACHMENT_BYTES};

use crate::auth::{JwtConfig, PublicEndpoints};
use crate::services::{AttachmentService, CategoryService, NoteService, TagService, UserService};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 저장소 (PostgreSQL 또는 인메모리)
    pub store: Arc<dyn Store>,

    /// 토큰 서명 키
    pub jwt: JwtConfig,

    /// 신원 없이 호출 가능한 엔드포인트
    pub public_endpoints: PublicEndpoints,

    /// 첨부파일 최대 크기 (바이트)
    pub max_attachment_bytes: usize,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jwt: JwtConfig) -> Self {
        Self {
            store,
            jwt,
            public_endpoints: PublicEndpoints::default(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 공개 엔드포인트 목록 교체.
    pub fn with_public_endpoints(mut self, endpoints: PublicEndpoints) -> Self {
        self.public_endpoints = endpoints;
        self
    }

    pub fn with_max_attachment_bytes(mut self, max_bytes: usize) -> Self {
        self.max_attachment_bytes = max_bytes;
        self
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone(), self.jwt.clone())
    }

    pub fn notes(&self) -> NoteService {
        NoteService::new(self.store.clone())
    }

    pub fn attachments(&self) -> AttachmentService {
        AttachmentService::new(self.store.clone(), self.max_attachment_bytes)
    }

    pub fn categories(&self) -> CategoryService {
        CategoryService::new(self.store.clone())
    }

    pub fn tags(&self) -> TagService {
        TagService::new(self.store.clone())
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 인메모리 저장소와 고정된 서명 키를 사용합니다.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    use crate::repository::MemoryStore;

    AppState::new(
        Arc::new(MemoryStore::new()),
        JwtConfig::new("test-secret-for-unit-tests"),
    )
}
