//! `{type}/{id}` 형식의 리소스 이름.
//!
//! API 응답의 `name` 필드와 요청의 리소스 참조(`note`, `category`, `tags` 등)에 사용합니다.

use std::fmt;

/// 리소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Note,
    Attachment,
    Category,
    Tag,
}

impl ResourceKind {
    /// 리소스 이름 접두사.
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::User => "users",
            ResourceKind::Note => "notes",
            ResourceKind::Attachment => "attachments",
            ResourceKind::Category => "categories",
            ResourceKind::Tag => "tags",
        }
    }

    /// 리소스 이름을 생성합니다.
    pub fn name(&self, id: i64) -> String {
        format!("{}/{}", self.prefix(), id)
    }

    /// 리소스 이름에서 ID를 추출합니다.
    ///
    /// 접두사가 다르거나 ID가 양의 정수가 아니면 에러를 반환합니다.
    pub fn parse_id(&self, name: &str) -> Result<i64, ResourceNameError> {
        let invalid = || ResourceNameError {
            expected: *self,
            name: name.to_string(),
        };
        let (prefix, id) = name.split_once('/').ok_or_else(invalid)?;
        if prefix != self.prefix() {
            return Err(invalid());
        }
        match id.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(invalid()),
        }
    }
}

/// 잘못된 리소스 이름.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected} name: {name}")]
pub struct ResourceNameError {
    pub expected: ResourceKind,
    pub name: String,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_format() {
        assert_eq!(ResourceKind::Note.name(42), "notes/42");
        assert_eq!(ResourceKind::Attachment.name(7), "attachments/7");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(ResourceKind::Note.parse_id("notes/42"), Ok(42));
        assert!(ResourceKind::Note.parse_id("tags/42").is_err());
        assert!(ResourceKind::Note.parse_id("notes/0").is_err());
        assert!(ResourceKind::Note.parse_id("notes/-3").is_err());
        assert!(ResourceKind::Note.parse_id("notes/abc").is_err());
        assert!(ResourceKind::Note.parse_id("notes").is_err());
        assert!(ResourceKind::Note.parse_id("notes/1/2").is_err());
    }
}
