//! Axum용 신원 확인 미들웨어.
//!
//! 모든 API 요청은 [`authenticate`]를 거칩니다. 확인된 `Option<Identity>`는
//! 요청 extension에 저장되고, 핸들러는 [`Caller`] 추출기로 꺼내 서비스에 명시적으로 전달합니다.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{header::AUTHORIZATION, request::Parts, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::{resolve_identity, Identity};
use crate::error::ServiceError;
use crate::state::AppState;

/// 서명 키 보관.
///
/// 기동 시 한 번 설정되고 이후 변경되지 않으므로 요청 간 동기화 없이 공유합니다.
#[derive(Clone)]
pub struct JwtConfig {
    secret: Arc<str>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// 신원 없이 호출할 수 있는 엔드포인트 목록.
///
/// `(HTTP 메서드, 라우트 패턴)` 쌍으로 구성되며 생성 후에는 변경할 수 없습니다.
#[derive(Debug, Clone)]
pub struct PublicEndpoints {
    routes: Arc<HashSet<(Method, String)>>,
}

impl PublicEndpoints {
    pub fn new<I, P>(routes: I) -> Self
    where
        I: IntoIterator<Item = (Method, P)>,
        P: Into<String>,
    {
        Self {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(method, path)| (method, path.into()))
                    .collect(),
            ),
        }
    }

    /// 라우트 패턴이 공개 엔드포인트인지 확인.
    pub fn contains(&self, method: &Method, route: &str) -> bool {
        self.routes.contains(&(method.clone(), route.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for PublicEndpoints {
    /// 가입, 로그인, 공개 목록/조회, 헬스체크, 메트릭, API 문서, 파일 다운로드.
    fn default() -> Self {
        Self::new([
            (Method::POST, "/api/v1/auth/register"),
            (Method::POST, "/api/v1/auth/login"),
            (Method::GET, "/api/v1/notes"),
            (Method::GET, "/api/v1/notes/{id}"),
            (Method::GET, "/api/v1/categories"),
            (Method::GET, "/api/v1/categories/{id}"),
            (Method::GET, "/api/v1/tags"),
            (Method::GET, "/api/v1/tags/{id}"),
            (Method::GET, "/api/v1/attachments"),
            (Method::GET, "/api/v1/attachments/{id}"),
            (Method::GET, "/file/attachments/{id}/{filename}"),
            (Method::GET, "/health"),
            (Method::GET, "/metrics"),
            (Method::GET, "/api-docs/openapi.json"),
        ])
    }
}

/// 요청 호출자.
///
/// `None`이면 익명 호출입니다. 미들웨어를 거치지 않은 요청에서도 `Caller(None)`으로 추출됩니다.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

/// 신원 확인 미들웨어.
///
/// 라우트 매칭 후에 실행되어야 하므로 `route_layer`로 등록합니다.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = resolve_identity(
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
        state.jwt.secret(),
        Utc::now(),
    );

    if identity.is_none() {
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str())
            .unwrap_or_else(|| req.uri().path());

        if !state.public_endpoints.contains(req.method(), route) {
            return ServiceError::AuthenticationRequired.into_response();
        }
    }

    req.extensions_mut().insert(Caller(identity));
    next.run(req).await
}
