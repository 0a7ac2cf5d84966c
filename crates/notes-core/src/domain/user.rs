//! 사용자 및 역할.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 사용자 역할.
///
/// `Admin`과 `Host`는 소유권 검사를 우회하는 특권 역할입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// 일반 사용자
    #[default]
    User,
    /// 관리자
    Admin,
    /// 사이트 소유자 (최초 가입자)
    Host,
}

impl Role {
    /// 소유권과 무관하게 읽기/수정이 허용되는 역할인지 확인.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Host)
    }

    /// 저장소/토큰에 기록되는 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Host => "HOST",
        }
    }

    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            "HOST" => Some(Role::Host),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 저장된 사용자 레코드.
///
/// 삭제는 `deleted_at` 표시로만 이루어지며, 저장소 조회는 삭제된 사용자를 반환하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub nickname: String,
    pub avatar: String,
    pub bio: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 사용자 생성 입력.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub nickname: String,
    pub role: Role,
}
