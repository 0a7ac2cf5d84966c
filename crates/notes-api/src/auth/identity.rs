//! 요청 신원(Identity) 확인.
//!
//! `Authorization: Bearer <token>` 헤더에서 신원을 복원합니다.
//! 토큰 서명만으로 판단하며 저장소를 조회하지 않습니다.

use chrono::{DateTime, Utc};
use serde::Serialize;

use notes_core::{ReadScope, Role};

use super::jwt::decode_access_token;

/// 요청 하나 동안만 유효한 인증된 신원.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: i64, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    /// 이 신원의 읽기 범위.
    pub fn read_scope(identity: Option<&Identity>) -> ReadScope {
        ReadScope::for_caller(identity.map(|id| (id.user_id, id.role)))
    }
}

/// Authorization 헤더 값에서 Bearer 토큰을 추출합니다.
///
/// 공백으로 구분된 필드가 정확히 두 개이고 첫 필드가 대소문자 무시 "bearer"일 때만 토큰을 반환합니다.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let mut fields = header.split_whitespace();
    let (scheme, token) = (fields.next()?, fields.next()?);
    if fields.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// 요청의 신원을 확인합니다.
///
/// 헤더가 없거나, 형식이 틀리거나, 토큰 검증에 실패하거나, subject가 정수가 아니면
/// `None`을 반환합니다. 에러를 발생시키지 않습니다.
pub fn resolve_identity(
    authorization: Option<&str>,
    secret: &str,
    now: DateTime<Utc>,
) -> Option<Identity> {
    let token = extract_bearer_token(authorization?)?;
    let claims = decode_access_token(token, secret, now).ok()?;
    let user_id = claims.sub.parse::<i64>().ok()?;

    Some(Identity {
        user_id,
        username: claims.username,
        role: claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{access_token_ttl, encode_access_token};
    use chrono::Duration;

    const SECRET: &str = "identity-test-secret";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("BEARER   abc  "), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer"), None);
        assert_eq!(extract_bearer_token("Bearer a b"), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token(""), None);
    }

    #[test]
    fn test_resolve_valid_token() {
        let (token, _) = encode_access_token(5, "carol", Role::Host, SECRET, now()).unwrap();
        let header = format!("Bearer {}", token);

        let identity = resolve_identity(Some(&header), SECRET, now()).unwrap();
        assert_eq!(identity, Identity::new(5, "carol", Role::Host));
    }

    #[test]
    fn test_resolve_absent_or_invalid() {
        assert_eq!(resolve_identity(None, SECRET, now()), None);
        assert_eq!(resolve_identity(Some("Bearer garbage"), SECRET, now()), None);

        let (token, _) = encode_access_token(5, "carol", Role::User, SECRET, now()).unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(resolve_identity(Some(&header), "other-secret", now()), None);
    }

    #[test]
    fn test_resolve_expired_token() {
        let issued = now() - access_token_ttl() - Duration::seconds(1);
        let (token, _) = encode_access_token(5, "carol", Role::User, SECRET, issued).unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(resolve_identity(Some(&header), SECRET, now()), None);
    }

    #[test]
    fn test_resolve_non_numeric_subject() {
        use crate::auth::jwt::{AccessClaims, ACCESS_TOKEN_AUDIENCE, ISSUER, KEY_ID};
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let claims = AccessClaims {
            token_type: "access".to_string(),
            role: Role::User,
            username: "mallory".to_string(),
            sub: "not-a-number".to_string(),
            iss: ISSUER.to_string(),
            aud: ACCESS_TOKEN_AUDIENCE.to_string(),
            iat: now().timestamp(),
            exp: (now() + access_token_ttl()).timestamp(),
        };
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(KEY_ID.to_string());
        let token = encode(&header, &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();

        let header = format!("Bearer {}", token);
        assert_eq!(resolve_identity(Some(&header), SECRET, now()), None);
    }

    #[test]
    fn test_read_scope() {
        assert_eq!(Identity::read_scope(None), ReadScope::PublicOnly);
        let user = Identity::new(3, "dave", Role::User);
        assert_eq!(Identity::read_scope(Some(&user)), ReadScope::PublicAndOwn(3));
        let admin = Identity::new(4, "erin", Role::Admin);
        assert_eq!(Identity::read_scope(Some(&admin)), ReadScope::Everything);
    }
}
