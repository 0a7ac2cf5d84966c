//! 공개 범위 및 권한 평가.
//!
//! 모든 함수는 입력만으로 결정되는 순수 함수이며, 요청마다 새로 평가합니다.
//! 거부 결과는 신원 유무에 따라 [`AccessDenied::AuthenticationRequired`]와
//! [`AccessDenied::PermissionDenied`]로 구분됩니다.

use notes_core::{Role, Visibility};

use super::Identity;

/// 접근 거부 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    /// 신원이 없음 (재로그인 필요)
    #[error("authentication required")]
    AuthenticationRequired,
    /// 신원은 있으나 권한 없음
    #[error("permission denied")]
    PermissionDenied,
}

impl AccessDenied {
    /// 신원 유무에 맞는 거부 사유.
    pub fn for_caller(identity: Option<&Identity>) -> Self {
        match identity {
            None => AccessDenied::AuthenticationRequired,
            Some(_) => AccessDenied::PermissionDenied,
        }
    }
}

/// 첨부파일의 노트 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentLink {
    /// 연결되지 않음 (또는 연결된 노트가 더 이상 없음)
    Unlinked,
    /// 노트에 연결됨
    Note { visibility: Visibility, author_id: i64 },
}

fn owns_or_privileged(author_id: i64, identity: &Identity) -> bool {
    identity.user_id == author_id || identity.role.is_privileged()
}

/// 읽기 허용 여부.
///
/// - PUBLIC: 항상 허용
/// - PRIVATE: 작성자 본인 또는 ADMIN/HOST
pub fn can_read(visibility: Visibility, author_id: i64, identity: Option<&Identity>) -> bool {
    Identity::read_scope(identity).permits(visibility, author_id)
}

/// 수정/삭제 허용 여부. 공개 범위는 고려하지 않습니다.
pub fn can_mutate(author_id: i64, identity: Option<&Identity>) -> bool {
    identity.is_some_and(|id| owns_or_privileged(author_id, id))
}

/// 첨부파일 읽기 허용 여부.
///
/// 연결된 첨부파일은 노트의 읽기 규칙을 따르고, 연결되지 않은 첨부파일은
/// 업로더 본인만 읽을 수 있습니다 (특권 역할 우회 없음).
// TODO: 미연결 첨부파일에 관리자 우회를 허용할지 제품 검토 후 결정
pub fn can_read_attachment(
    attachment_author_id: i64,
    link: AttachmentLink,
    identity: Option<&Identity>,
) -> bool {
    match link {
        AttachmentLink::Note {
            visibility,
            author_id,
        } => can_read(visibility, author_id, identity),
        AttachmentLink::Unlinked => identity.is_some_and(|id| id.user_id == attachment_author_id),
    }
}

/// 역할 변경 허용 여부.
///
/// 요청한 역할이 현재 역할과 같으면 변경이 아니므로 허용합니다.
/// 실제 변경은 ADMIN/HOST 호출자만 할 수 있습니다.
pub fn can_change_role(current: Role, requested: Role, identity: Option<&Identity>) -> bool {
    current == requested || identity.is_some_and(Identity::is_privileged)
}

pub fn authorize_read(
    visibility: Visibility,
    author_id: i64,
    identity: Option<&Identity>,
) -> Result<(), AccessDenied> {
    if can_read(visibility, author_id, identity) {
        Ok(())
    } else {
        Err(AccessDenied::for_caller(identity))
    }
}

pub fn authorize_mutation(author_id: i64, identity: Option<&Identity>) -> Result<(), AccessDenied> {
    if can_mutate(author_id, identity) {
        Ok(())
    } else {
        Err(AccessDenied::for_caller(identity))
    }
}

pub fn authorize_attachment_read(
    attachment_author_id: i64,
    link: AttachmentLink,
    identity: Option<&Identity>,
) -> Result<(), AccessDenied> {
    if can_read_attachment(attachment_author_id, link, identity) {
        Ok(())
    } else {
        Err(AccessDenied::for_caller(identity))
    }
}

pub fn authorize_role_change(
    current: Role,
    requested: Role,
    identity: Option<&Identity>,
) -> Result<(), AccessDenied> {
    if can_change_role(current, requested, identity) {
        Ok(())
    } else {
        Err(AccessDenied::for_caller(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user(id: i64) -> Identity {
        Identity::new(id, format!("user{}", id), Role::User)
    }

    fn with_role(id: i64, role: Role) -> Identity {
        Identity::new(id, format!("user{}", id), role)
    }

    #[test]
    fn test_private_note_hidden_from_stranger() {
        assert!(!can_read(Visibility::Private, 1, Some(&user(2))));
        assert!(can_read(Visibility::Private, 1, Some(&user(1))));
        assert!(!can_read(Visibility::Private, 1, None));
    }

    #[test]
    fn test_admin_override() {
        assert!(can_read(Visibility::Private, 1, Some(&with_role(99, Role::Admin))));
        assert!(can_read(Visibility::Private, 1, Some(&with_role(99, Role::Host))));
        assert!(can_mutate(1, Some(&with_role(99, Role::Admin))));
    }

    #[test]
    fn test_mutation_ignores_visibility() {
        // 작성자는 비공개 노트도 수정 가능, 타인은 공개 노트도 수정 불가
        assert!(can_mutate(1, Some(&user(1))));
        assert!(!can_mutate(1, Some(&user(2))));
        assert!(!can_mutate(1, None));
    }

    #[test]
    fn test_denial_distinguishes_missing_identity() {
        assert_eq!(
            authorize_read(Visibility::Private, 1, None),
            Err(AccessDenied::AuthenticationRequired)
        );
        assert_eq!(
            authorize_read(Visibility::Private, 1, Some(&user(2))),
            Err(AccessDenied::PermissionDenied)
        );
        assert_eq!(
            authorize_mutation(1, None),
            Err(AccessDenied::AuthenticationRequired)
        );
        assert_eq!(
            authorize_mutation(1, Some(&user(2))),
            Err(AccessDenied::PermissionDenied)
        );
        assert_eq!(authorize_mutation(1, Some(&user(1))), Ok(()));
    }

    #[test]
    fn test_linked_attachment_follows_note() {
        let private_note = AttachmentLink::Note {
            visibility: Visibility::Private,
            author_id: 1,
        };
        let public_note = AttachmentLink::Note {
            visibility: Visibility::Public,
            author_id: 1,
        };

        assert!(can_read_attachment(5, public_note, None));
        assert!(!can_read_attachment(5, private_note, None));
        // 업로더라도 비공개 노트의 작성자가 아니면 읽을 수 없음
        assert!(!can_read_attachment(5, private_note, Some(&user(5))));
        assert!(can_read_attachment(5, private_note, Some(&user(1))));
        assert!(can_read_attachment(5, private_note, Some(&with_role(9, Role::Admin))));
    }

    #[test]
    fn test_unlinked_attachment_author_only() {
        let link = AttachmentLink::Unlinked;
        assert!(can_read_attachment(5, link, Some(&user(5))));
        assert!(!can_read_attachment(5, link, Some(&user(6))));
        assert!(!can_read_attachment(5, link, Some(&with_role(6, Role::Admin))));
        assert!(!can_read_attachment(5, link, Some(&with_role(6, Role::Host))));
        assert_eq!(
            authorize_attachment_read(5, link, None),
            Err(AccessDenied::AuthenticationRequired)
        );
        assert_eq!(
            authorize_attachment_read(5, link, Some(&with_role(6, Role::Admin))),
            Err(AccessDenied::PermissionDenied)
        );
    }

    #[test]
    fn test_role_escalation_guard() {
        let plain = user(3);
        assert!(!can_change_role(Role::User, Role::Admin, Some(&plain)));
        assert!(!can_change_role(Role::User, Role::Host, Some(&plain)));
        assert!(can_change_role(Role::User, Role::User, Some(&plain)));
        assert!(can_change_role(Role::User, Role::Admin, Some(&with_role(1, Role::Host))));
        assert_eq!(
            authorize_role_change(Role::User, Role::Admin, Some(&plain)),
            Err(AccessDenied::PermissionDenied)
        );
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::User), Just(Role::Admin), Just(Role::Host)]
    }

    fn any_identity() -> impl Strategy<Value = Option<Identity>> {
        proptest::option::of((1i64..1000, any_role()).prop_map(|(id, role)| with_role(id, role)))
    }

    proptest! {
        #[test]
        fn prop_public_always_readable(author in 1i64..1000, identity in any_identity()) {
            prop_assert!(can_read(Visibility::Public, author, identity.as_ref()));
        }

        #[test]
        fn prop_private_readable_iff_owner_or_privileged(
            author in 1i64..1000,
            identity in any_identity(),
        ) {
            let expected = identity
                .as_ref()
                .is_some_and(|id| id.user_id == author || id.role.is_privileged());
            prop_assert_eq!(can_read(Visibility::Private, author, identity.as_ref()), expected);
        }

        #[test]
        fn prop_mutation_requires_ownership_or_privilege(
            author in 1i64..1000,
            other in 1i64..1000,
        ) {
            prop_assert!(!can_mutate(author, None));
            if other != author {
                prop_assert!(!can_mutate(author, Some(&user(other))));
            }
        }
    }
}
