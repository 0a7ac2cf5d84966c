//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`jwt`]: 액세스 토큰 인코딩/디코딩
//! - [`identity`]: Authorization 헤더에서 요청 신원 복원
//! - [`permission`]: 공개 범위/소유권 기반 읽기·수정 권한 평가
//! - [`middleware`]: 신원 확인 미들웨어, 공개 엔드포인트 목록, [`Caller`] 추출기
//! - [`password`]: Argon2 비밀번호 해싱
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn handler(State(state): State<Arc<AppState>>, caller: Caller) -> ApiResult<Json<Note>> {
//!     let note = state.notes().get_note(caller.identity(), 42).await?;
//!     Ok(Json(note))
//! }
//! ```

pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permission;

pub use identity::{extract_bearer_token, resolve_identity, Identity};
pub use jwt::{decode_access_token, encode_access_token, AccessClaims, TokenError};
pub use middleware::{authenticate, Caller, JwtConfig, PublicEndpoints};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use permission::{
    authorize_attachment_read, authorize_mutation, authorize_read, authorize_role_change,
    can_mutate, can_read, can_read_attachment, AccessDenied, AttachmentLink,
};
