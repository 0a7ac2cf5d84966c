//! 액세스 토큰 인코딩/디코딩.
//!
//! HS256으로 서명한 상태 없는(stateless) 토큰입니다. 서버 측 세션 테이블이나
//! 폐기 목록은 없으며, 만료 시각만이 토큰을 종료시킵니다.
//!
//! 검증 항목:
//! - 서명 (HS256 외 알고리즘은 서명 실패로 처리)
//! - 헤더 `kid` == [`KEY_ID`]
//! - `iss` == [`ISSUER`], `aud` == [`ACCESS_TOKEN_AUDIENCE`]
//! - `now < exp`
//! - `type` == [`ACCESS_TOKEN_TYPE`]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use notes_core::Role;

/// 토큰 발급자.
pub const ISSUER: &str = "simple-notes";
/// 서명 키 식별자.
pub const KEY_ID: &str = "v1";
/// 액세스 토큰 audience.
pub const ACCESS_TOKEN_AUDIENCE: &str = "user.access-token";
/// 액세스 토큰 type 클레임 값.
pub const ACCESS_TOKEN_TYPE: &str = "access";
/// 액세스 토큰 유효 기간 (시간).
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;

/// 액세스 토큰 유효 기간.
pub fn access_token_ttl() -> Duration {
    Duration::hours(ACCESS_TOKEN_TTL_HOURS)
}

/// 액세스 토큰 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 토큰 종류 (항상 "access")
    #[serde(rename = "type")]
    pub token_type: String,
    /// 사용자 역할
    pub role: Role,
    /// 사용자 이름
    pub username: String,
    /// Subject - 문자열로 표현한 사용자 ID
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    /// 만료 시각.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// 토큰 검증 에러.
///
/// 신원 확인 단계에서 모두 "신원 없음"으로 흡수되며 클라이언트에 개별 노출되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("서명 검증 실패")]
    BadSignature,
    #[error("알 수 없는 키 식별자")]
    BadKeyId,
    #[error("잘못된 발급자")]
    BadIssuer,
    #[error("잘못된 audience")]
    BadAudience,
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("액세스 토큰이 아닙니다")]
    WrongType,
    #[error("잘못된 토큰 형식")]
    Malformed,
    #[error("토큰 서명 실패: {0}")]
    Signing(String),
}

/// 액세스 토큰 발급.
///
/// # Arguments
///
/// * `user_id` - 사용자 ID (`sub`에 문자열로 기록)
/// * `username` - 사용자 이름
/// * `role` - 사용자 역할
/// * `secret` - 서명 키
/// * `now` - 발급 시각
///
/// # Returns
///
/// (토큰 문자열, 만료 시각)
pub fn encode_access_token(
    user_id: i64,
    username: &str,
    role: Role,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), TokenError> {
    let expires_at = now + access_token_ttl();
    let claims = AccessClaims {
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        role,
        username: username.to_string(),
        sub: user_id.to_string(),
        iss: ISSUER.to_string(),
        aud: ACCESS_TOKEN_AUDIENCE.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KEY_ID.to_string());

    let token = encode(&header, &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| TokenError::Signing(e.to_string()))?;

    Ok((token, expires_at))
}

/// 액세스 토큰 디코딩 및 검증.
///
/// 시각 비교 외의 부수 효과가 없는 전함수(total function)입니다.
pub fn decode_access_token(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<AccessClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // 만료는 주입된 `now`로 직접 비교한다
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[ACCESS_TOKEN_AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => TokenError::BadSignature,
        ErrorKind::InvalidIssuer => TokenError::BadIssuer,
        ErrorKind::InvalidAudience => TokenError::BadAudience,
        // `alg: none`처럼 jsonwebtoken이 모르는 알고리즘은 헤더 파싱 에러로 나온다
        _ if declares_foreign_algorithm(token) => TokenError::BadSignature,
        _ => TokenError::Malformed,
    })?;

    if data.header.kid.as_deref() != Some(KEY_ID) {
        return Err(TokenError::BadKeyId);
    }

    let claims = data.claims;
    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(TokenError::WrongType);
    }

    Ok(claims)
}

/// 헤더가 HS256이 아닌 `alg` 문자열을 선언했는지 확인합니다.
fn declares_foreign_algorithm(token: &str) -> bool {
    token
        .split('.')
        .next()
        .and_then(|segment| URL_SAFE_NO_PAD.decode(segment).ok())
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .and_then(|header| header.get("alg").and_then(|alg| alg.as_str()).map(|alg| alg != "HS256"))
        .unwrap_or(false)
}
