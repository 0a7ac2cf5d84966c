//! 헬스 체크.
//!
//! 프로세스 생존 여부와 함께 저장소에 실제로 질의가 가능한지 확인합니다.
//! 저장소가 응답하지 않으면 503을 돌려주어 로드밸런서가 트래픽을 빼도록 합니다.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// "healthy" 또는 "unhealthy"
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub checked_at: DateTime<Utc>,
    pub components: ComponentHealth,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub store: ComponentStatus,
}

/// 의존 컴포넌트 하나의 상태.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentStatus {
    /// "up" 또는 "down"
    pub status: String,
    /// 저장소 종류 ("postgres" | "memory")
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentStatus {
    pub fn up(backend: impl Into<String>) -> Self {
        Self {
            status: "up".to_string(),
            backend: backend.into(),
            error: None,
        }
    }

    pub fn down(backend: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            backend: backend.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "정상", body = HealthResponse),
        (status = 503, description = "저장소 응답 없음", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.store.backend();
    let store = match state.store.ping().await {
        Ok(()) => ComponentStatus::up(backend),
        Err(e) => {
            tracing::error!(backend, error = %e, "Store health check failed");
            ComponentStatus::down(backend, "store unreachable")
        }
    };

    let (status, code) = if store.is_up() {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        checked_at: Utc::now(),
        components: ComponentHealth { store },
    };
    (code, Json(body))
}

pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_check))
}
