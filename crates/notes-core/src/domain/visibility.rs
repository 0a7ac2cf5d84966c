//! 공개 범위와 읽기 범위.
//!
//! [`ReadScope`]는 "어떤 사용자가 어떤 리소스를 읽을 수 있는가"를 한 곳에서 정의합니다.
//! 단건 검사와 목록 쿼리 필터가 같은 규칙을 공유하므로, 목록의 `total`과
//! 단건 조회 결과가 서로 어긋나지 않습니다.

use serde::{Deserialize, Serialize};

use super::Role;

/// 리소스 공개 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// 누구나 읽을 수 있음
    #[default]
    Public,
    /// 작성자와 특권 역할만 읽을 수 있음
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }

    /// 문자열에서 공개 범위 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 호출자가 읽을 수 있는 리소스의 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// 익명 호출자: 공개 리소스만
    PublicOnly,
    /// 일반 사용자: 공개 리소스와 본인 리소스
    PublicAndOwn(i64),
    /// 특권 역할: 전부
    Everything,
}

impl ReadScope {
    /// 호출자 정보(사용자 ID, 역할)에서 읽기 범위를 결정합니다.
    pub fn for_caller(caller: Option<(i64, Role)>) -> Self {
        match caller {
            None => ReadScope::PublicOnly,
            Some((_, role)) if role.is_privileged() => ReadScope::Everything,
            Some((user_id, _)) => ReadScope::PublicAndOwn(user_id),
        }
    }

    /// 주어진 공개 범위/작성자의 리소스가 이 범위에 포함되는지 확인.
    pub fn permits(&self, visibility: Visibility, author_id: i64) -> bool {
        if visibility == Visibility::Public {
            return true;
        }
        match self {
            ReadScope::PublicOnly => false,
            ReadScope::PublicAndOwn(user_id) => *user_id == author_id,
            ReadScope::Everything => true,
        }
    }
}
