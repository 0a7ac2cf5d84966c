//! 노트 서비스 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - 상태 없는 액세스 토큰 인증과 공개 범위 기반 권한 판단
//! - PostgreSQL / 인메모리 저장소
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`services`]: 자원별 비즈니스 로직 (호출자 신원을 명시적으로 전달받음)
//! - [`auth`]: 토큰, 신원 확인 미들웨어, 권한 판단, 비밀번호 해시
//! - [`repository`]: 저장소 구현
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{Caller, Identity, JwtConfig, PublicEndpoints};
pub use error::{ApiErrorResponse, ApiResult, ServiceError};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use repository::{MemoryStore, PgStore};
pub use routes::create_api_router;
pub use state::AppState;
