//! 사용자 서비스.
//!
//! 가입, 로그인(액세스 토큰 발급), 프로필 조회/수정, 소프트 삭제를 담당합니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use notes_core::{NewUser, ResourceKind, Role, Store, User};

use super::non_empty;
use crate::auth::{
    authorize_mutation, authorize_role_change, encode_access_token, hash_password,
    validate_password, verify_password, Identity, JwtConfig,
};
use crate::error::{ApiResult, ServiceError};

/// 로그인 실패 메시지. 사용자 존재 여부를 드러내지 않도록 항상 같은 문구를 씁니다.
const INVALID_CREDENTIALS: &str = "invalid username or password";

// =============================================================================
// 요청/응답 타입
// =============================================================================

fn validate_username(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ValidationError::new("username_length")
            .with_message("username must be 3-50 characters".into()));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::new("username_charset")
            .with_message("username may only contain letters, digits, '_' and '-'".into()));
    }
    Ok(())
}

fn validate_password_rule(value: &str) -> Result<(), ValidationError> {
    validate_password(value)
        .map_err(|msg| ValidationError::new("password").with_message(msg.into()))
}

/// 가입 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_password_rule"))]
    pub password: String,
    #[serde(default)]
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// 로그인 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 사용자 수정 요청. 비어 있지 않은 필드만 반영됩니다.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// 사용자 응답.
///
/// 이메일은 본인 또는 ADMIN/HOST에게만 노출됩니다.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    /// 리소스 이름 (`users/{id}`)
    pub name: String,
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub nickname: String,
    pub avatar: String,
    pub bio: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserView {
    fn new(user: User, include_email: bool) -> Self {
        Self {
            name: ResourceKind::User.name(user.id),
            id: user.id,
            username: user.username,
            email: include_email.then_some(user.email),
            nickname: user.nickname,
            avatar: user.avatar,
            bio: user.bio,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    /// 호출자 기준으로 노출 범위를 정해 변환합니다.
    pub fn for_caller(user: User, identity: Option<&Identity>) -> Self {
        let include_email =
            identity.is_some_and(|id| id.user_id == user.id || id.is_privileged());
        Self::new(user, include_email)
    }
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// 사용자 목록 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub total: usize,
}

// =============================================================================
// 서비스
// =============================================================================

/// Argon2 해싱은 CPU를 오래 쓰므로 블로킹 스레드에서 실행합니다.
async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

async fn verify_blocking(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("password verification task failed: {}", e)))
}

/// 사용자 서비스.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    jwt: JwtConfig,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtConfig) -> Self {
        Self { store, jwt }
    }

    /// 가입.
    ///
    /// 저장소에 사용자가 하나도 없으면 HOST, 그 외에는 USER 역할을 부여합니다.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<UserView> {
        req.validate()?;

        if self
            .store
            .find_user_by_username(&req.username)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "username already exists: {}",
                req.username
            )));
        }

        let role = if self.store.count_users().await? == 0 {
            Role::Host
        } else {
            Role::User
        };

        let password_hash = hash_blocking(req.password).await?;
        let nickname = non_empty(req.nickname).unwrap_or_else(|| req.username.clone());

        let user = self
            .store
            .create_user(NewUser {
                username: req.username,
                password_hash,
                email: non_empty(req.email).unwrap_or_default(),
                nickname,
                role,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, role = %user.role, "User registered");
        Ok(UserView::new(user, true))
    }

    /// 로그인하고 액세스 토큰을 발급합니다.
    ///
    /// 없는 사용자와 틀린 비밀번호는 같은 401 응답으로 처리합니다.
    pub async fn login(&self, req: LoginRequest, now: DateTime<Utc>) -> ApiResult<LoginResponse> {
        if req.username.is_empty() || req.password.is_empty() {
            return Err(ServiceError::invalid("username and password are required"));
        }

        let Some(user) = self.store.find_user_by_username(&req.username).await? else {
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_blocking(req.password, user.password_hash.clone()).await? {
            warn!(username = %req.username, "Login failed: password mismatch");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        let (access_token, expires_at) =
            encode_access_token(user.id, &user.username, user.role, self.jwt.secret(), now)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;

        info!(user_id = user.id, "User logged in");
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at,
            user: UserView::new(user, true),
        })
    }

    /// 현재 사용자.
    ///
    /// 토큰이 유효해도 사용자가 삭제되었으면 인증 실패로 처리합니다.
    pub async fn current_user(&self, identity: Option<&Identity>) -> ApiResult<UserView> {
        let identity = identity.ok_or(ServiceError::AuthenticationRequired)?;
        let user = self
            .store
            .find_user_by_id(identity.user_id)
            .await?
            .ok_or(ServiceError::AuthenticationRequired)?;
        Ok(UserView::new(user, true))
    }

    /// 사용자 목록. ADMIN/HOST 전용.
    pub async fn list_users(&self, identity: Option<&Identity>) -> ApiResult<UserListResponse> {
        match identity {
            None => return Err(ServiceError::AuthenticationRequired),
            Some(id) if !id.is_privileged() => return Err(ServiceError::permission_denied()),
            Some(_) => {}
        }

        let users: Vec<UserView> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|user| UserView::new(user, true))
            .collect();

        Ok(UserListResponse {
            total: users.len(),
            users,
        })
    }

    pub async fn get_user(&self, identity: Option<&Identity>, id: i64) -> ApiResult<UserView> {
        let user = self.find(id).await?;
        Ok(UserView::for_caller(user, identity))
    }

    /// 프로필 수정.
    ///
    /// 본인 또는 ADMIN/HOST만 수정할 수 있고, 역할 변경은 ADMIN/HOST만 가능합니다.
    pub async fn update_user(
        &self,
        identity: Option<&Identity>,
        id: i64,
        req: UpdateUserRequest,
    ) -> ApiResult<UserView> {
        let mut user = self.find(id).await?;
        authorize_mutation(user.id, identity)?;

        if let Some(role) = req.role {
            authorize_role_change(user.role, role, identity)?;
            user.role = role;
        }

        if let Some(username) = non_empty(req.username) {
            validate_username(&username).map_err(|e| {
                ServiceError::invalid(
                    e.message
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid username".to_string()),
                )
            })?;
            if username != user.username {
                if let Some(other) = self.store.find_user_by_username(&username).await? {
                    if other.id != user.id {
                        return Err(ServiceError::Conflict(format!(
                            "username already exists: {}",
                            username
                        )));
                    }
                }
            }
            user.username = username;
        }
        if let Some(nickname) = non_empty(req.nickname) {
            user.nickname = nickname;
        }
        if let Some(avatar) = non_empty(req.avatar) {
            user.avatar = avatar;
        }
        if let Some(bio) = non_empty(req.bio) {
            user.bio = bio;
        }
        if let Some(password) = non_empty(req.password) {
            validate_password(&password).map_err(ServiceError::invalid)?;
            user.password_hash = hash_blocking(password).await?;
        }

        let updated = self.store.update_user(&user).await?;
        info!(user_id = updated.id, "User updated");
        Ok(UserView::for_caller(updated, identity))
    }

    /// 소프트 삭제. 본인 또는 ADMIN/HOST.
    pub async fn delete_user(&self, identity: Option<&Identity>, id: i64) -> ApiResult<()> {
        let user = self.find(id).await?;
        authorize_mutation(user.id, identity)?;

        self.store.delete_user(user.id).await?;
        info!(user_id = user.id, "User deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> ApiResult<User> {
        self.store
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user not found: {}", ResourceKind::User.name(id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::decode_access_token;
    use crate::repository::MemoryStore;

    const SECRET: &str = "user-service-test-secret";

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()), JwtConfig::new(SECRET))
    }

    fn register_req(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: "secret-pw".to_string(),
            email: None,
            nickname: None,
        }
    }

    fn identity_of(view: &UserView) -> Identity {
        Identity::new(view.id, view.username.clone(), view.role)
    }

    #[tokio::test]
    async fn test_first_user_becomes_host() {
        let svc = service();
        let first = svc.register(register_req("alice")).await.unwrap();
        let second = svc.register(register_req("bob")).await.unwrap();

        assert_eq!(first.role, Role::Host);
        assert_eq!(second.role, Role::User);
        assert_eq!(first.name, format!("users/{}", first.id));
        assert_eq!(second.nickname, "bob");
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let svc = service();
        assert!(matches!(
            svc.register(register_req("ab")).await,
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            svc.register(register_req("bad name")).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let mut short_pw = register_req("carol");
        short_pw.password = "12345".to_string();
        assert!(matches!(
            svc.register(short_pw).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let mut bad_email = register_req("carol");
        bad_email.email = Some("not-an-email".to_string());
        assert!(matches!(
            svc.register(bad_email).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        svc.register(register_req("carol")).await.unwrap();
        assert!(matches!(
            svc.register(register_req("carol")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_issues_decodable_token() {
        let svc = service();
        let user = svc.register(register_req("alice")).await.unwrap();
        let now = Utc::now();

        let resp = svc
            .login(
                LoginRequest {
                    username: "alice".to_string(),
                    password: "secret-pw".to_string(),
                },
                now,
            )
            .await
            .unwrap();

        assert_eq!(resp.token_type, "Bearer");
        let claims = decode_access_token(&resp.access_token, SECRET, now).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Host);
    }

    #[tokio::test]
    async fn test_login_failures_share_message() {
        let svc = service();
        svc.register(register_req("alice")).await.unwrap();

        let wrong_pw = svc
            .login(
                LoginRequest {
                    username: "alice".to_string(),
                    password: "wrong-pw".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        let unknown = svc
            .login(
                LoginRequest {
                    username: "nobody".to_string(),
                    password: "secret-pw".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_plain_user_cannot_escalate_role() {
        let svc = service();
        let _host = svc.register(register_req("alice")).await.unwrap();
        let bob = svc.register(register_req("bob")).await.unwrap();
        let bob_id = identity_of(&bob);

        let err = svc
            .update_user(
                Some(&bob_id),
                bob.id,
                UpdateUserRequest {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        // 같은 역할을 그대로 보내는 것은 변경이 아님
        let same = svc
            .update_user(
                Some(&bob_id),
                bob.id,
                UpdateUserRequest {
                    role: Some(Role::User),
                    bio: Some("hello".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.role, Role::User);
        assert_eq!(same.bio, "hello");
    }

    #[tokio::test]
    async fn test_host_can_promote_and_others_cannot_edit() {
        let svc = service();
        let host = svc.register(register_req("alice")).await.unwrap();
        let bob = svc.register(register_req("bob")).await.unwrap();
        let carol = svc.register(register_req("carol")).await.unwrap();

        let promoted = svc
            .update_user(
                Some(&identity_of(&host)),
                bob.id,
                UpdateUserRequest {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let err = svc
            .update_user(
                Some(&identity_of(&carol)),
                host.id,
                UpdateUserRequest {
                    bio: Some("pwned".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let err = svc
            .update_user(None, host.id, UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn test_username_change_conflict() {
        let svc = service();
        let alice = svc.register(register_req("alice")).await.unwrap();
        svc.register(register_req("bob")).await.unwrap();

        let err = svc
            .update_user(
                Some(&identity_of(&alice)),
                alice.id,
                UpdateUserRequest {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_users_requires_privilege() {
        let svc = service();
        let host = svc.register(register_req("alice")).await.unwrap();
        let bob = svc.register(register_req("bob")).await.unwrap();

        assert!(matches!(
            svc.list_users(None).await,
            Err(ServiceError::AuthenticationRequired)
        ));
        assert!(matches!(
            svc.list_users(Some(&identity_of(&bob))).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        let list = svc.list_users(Some(&identity_of(&host))).await.unwrap();
        assert_eq!(list.total, 2);
    }

    #[tokio::test]
    async fn test_deleted_user_cannot_login_or_resolve() {
        let svc = service();
        let alice = svc.register(register_req("alice")).await.unwrap();
        let id = identity_of(&alice);

        svc.delete_user(Some(&id), alice.id).await.unwrap();

        assert!(matches!(
            svc.current_user(Some(&id)).await,
            Err(ServiceError::AuthenticationRequired)
        ));
        assert!(svc
            .login(
                LoginRequest {
                    username: "alice".to_string(),
                    password: "secret-pw".to_string(),
                },
                Utc::now(),
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_email_hidden_from_strangers() {
        let svc = service();
        let mut req = register_req("alice");
        req.email = Some("alice@example.com".to_string());
        let alice = svc.register(req).await.unwrap();
        let bob = svc.register(register_req("bob")).await.unwrap();

        let seen_by_bob = svc.get_user(Some(&identity_of(&bob)), alice.id).await.unwrap();
        assert_eq!(seen_by_bob.email, None);

        let seen_by_self = svc.get_user(Some(&identity_of(&alice)), alice.id).await.unwrap();
        assert_eq!(seen_by_self.email.as_deref(), Some("alice@example.com"));
    }
}
