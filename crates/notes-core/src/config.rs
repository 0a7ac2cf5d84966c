//! 설정 관리.
//!
//! 설정은 다음 순서로 덮어씁니다 (뒤가 우선):
//! 1. 코드에 정의된 기본값
//! 2. `config/default.toml` (선택)
//! 3. `config/{RUN_ENV}.toml` (선택)
//! 4. `NOTES__` 접두사 환경 변수 (예: `NOTES__SERVER__PORT=8080`)
//! 5. 관례적인 단일 환경 변수 `JWT_SECRET`, `DATABASE_URL`

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NotesError, NotesResult};

/// 개발 환경 전용 기본 서명 키.
///
/// 운영 환경(`RUN_ENV=production`)에서는 이 값으로 기동할 수 없습니다.
pub const DEV_JWT_SECRET: &str = "simple-notes-dev-secret-change-me";

/// 첨부파일 최대 크기 기본값 (32 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 32 << 20;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 실행 환경 이름 (development, test, production)
    #[serde(default = "default_run_env")]
    pub run_env: String,
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 업로드 설정
    #[serde(default)]
    pub uploads: UploadConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_run_env() -> String {
    "development".to_string()
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 허용할 CORS origin 목록 (비어 있으면 localhost 개발 origin만 허용)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_origins: Vec::new(),
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL. 없으면 메모리 저장소로 동작합니다.
    #[serde(default)]
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 5,
        }
    }
}

/// 인증 설정.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// 액세스 토큰 서명 키
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// 업로드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// 첨부파일 최대 크기 (바이트)
    pub max_attachment_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 설정 디렉토리와 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> NotesResult<Self> {
        let dir = config_dir.as_ref();
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| default_run_env());

        let builder = config::Config::builder()
            .set_default("run_env", run_env.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.connection_timeout_secs", 5)?
            .set_default("uploads.max_attachment_bytes", DEFAULT_MAX_ATTACHMENT_BYTES as u64)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(config::File::from(dir.join("default.toml")).required(false))
            .add_source(config::File::from(dir.join(format!("{}.toml", run_env))).required(false))
            .add_source(
                config::Environment::with_prefix("NOTES")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// 기본 경로(`config/`)에서 설정을 로드합니다.
    pub fn load_default() -> NotesResult<Self> {
        Self::load("config")
    }

    /// 운영 환경 여부.
    pub fn is_production(&self) -> bool {
        self.run_env.eq_ignore_ascii_case("production")
    }

    /// 사용할 서명 키를 결정합니다.
    ///
    /// 반환값의 두 번째 요소는 개발용 기본 키로 대체되었는지 여부입니다.
    /// 운영 환경에서 키가 없거나 개발용 기본 키와 같으면 에러를 반환합니다.
    pub fn resolve_jwt_secret(&self) -> NotesResult<(String, bool)> {
        match self.auth.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() && secret != DEV_JWT_SECRET => {
                Ok((secret.to_string(), false))
            }
            _ if self.is_production() => Err(NotesError::Config(
                "JWT_SECRET must be set to a non-default value in production".to_string(),
            )),
            _ => Ok((DEV_JWT_SECRET.to_string(), true)),
        }
    }

    /// 바인딩 주소 문자열 ("host:port").
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
