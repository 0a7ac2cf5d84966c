//! 노트 서비스 API 서버.
//!
//! 설정을 읽고 저장소를 연결한 뒤 Axum 서버를 시작합니다.
//! `DATABASE_URL`이 없으면 인메모리 저장소로 동작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use notes_api::auth::JwtConfig;
use notes_api::metrics::setup_metrics_recorder;
use notes_api::middleware::metrics_layer;
use notes_api::repository::{MemoryStore, PgStore};
use notes_api::routes::create_api_router;
use notes_api::state::AppState;
use notes_core::{init_logging, AppConfig, LogConfig, Store};

/// 저장소 선택.
///
/// 연결 URL이 있으면 PostgreSQL에 연결하고, 없으면 인메모리 저장소를 씁니다.
async fn create_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let Some(url) = config.database.url.as_deref().filter(|u| !u.is_empty()) else {
        warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = PgStore::connect(url, &config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    store
        .ping()
        .await
        .context("PostgreSQL connection check failed")?;

    info!(
        max_connections = config.database.max_connections,
        "Connected to PostgreSQL successfully"
    );
    Ok(Arc::new(store))
}

/// CORS 레이어 생성.
///
/// `server.cors_origins`가 설정되어 있으면 해당 origin만 허용합니다.
/// 비어 있으면 개발 모드로 간주하여 localhost origin만 허용합니다.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if parsed.is_empty() {
        if !origins.is_empty() {
            warn!("cors_origins contains no valid origins, allowing localhost only");
        } else {
            warn!("cors_origins not set, allowing localhost only (development mode)");
        }
        AllowOrigin::predicate(|origin, _| {
            origin
                .to_str()
                .map(|o| o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1"))
                .unwrap_or(false)
        })
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            axum::http::header::RANGE,
        ])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: PrometheusHandle, config: &AppConfig) -> Router {
    // 메트릭 라우터 (별도 상태, 신원 확인 제외)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router(state))
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(cors_layer(&config.server.cors_origins))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from_env_or(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!(run_env = %config.run_env, "Starting Notes API server...");

    let metrics_handle = setup_metrics_recorder().context("failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = config.socket_addr().parse().map_err(|e| {
        error!(
            host = %config.server.host,
            port = config.server.port,
            error = %e,
            "소켓 주소 설정이 유효하지 않습니다. NOTES__SERVER__HOST, NOTES__SERVER__PORT 환경변수를 확인하세요."
        );
        e
    })?;

    let (jwt_secret, is_dev_secret) = config.resolve_jwt_secret()?;
    if is_dev_secret {
        warn!("JWT_SECRET not set, using default (INSECURE for development only)");
    }

    let store = create_store(&config).await?;
    let state = Arc::new(
        AppState::new(store, JwtConfig::new(jwt_secret))
            .with_max_attachment_bytes(config.uploads.max_attachment_bytes),
    );

    info!(
        version = %state.version,
        store = state.store.backend(),
        public_endpoints = state.public_endpoints.len(),
        max_attachment_bytes = state.max_attachment_bytes,
        "Application state initialized"
    );

    let app = create_router(state, metrics_handle, &config);

    info!(%addr, "API server listening");
    info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환합니다.
/// 시그널 핸들러 설치에 실패하면 해당 시그널은 기다리지 않습니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
