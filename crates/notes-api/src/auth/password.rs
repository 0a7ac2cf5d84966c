//! 비밀번호 해싱.
//!
//! Argon2id(PHC 문자열 형식)를 사용합니다. 해시에 솔트가 포함되므로
//! 같은 비밀번호라도 매번 다른 해시가 생성됩니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// 최소 비밀번호 길이 (문자 수).
pub const MIN_PASSWORD_LEN: usize = 6;
/// 최대 비밀번호 길이 (문자 수).
pub const MAX_PASSWORD_LEN: usize = 128;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
}

/// 비밀번호 해싱.
///
/// # Returns
///
/// PHC 형식의 해시 문자열 (예: `$argon2id$v=19$m=19456,t=2,p=1$...`)
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::HashingFailed)
}

/// 저장된 해시와 평문 비밀번호가 일치하는지 확인합니다.
///
/// 해시 형식이 잘못된 경우에도 `false`를 반환합니다.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 비밀번호 길이 규칙 검증.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err("password must be at least 6 characters");
    }
    if len > MAX_PASSWORD_LEN {
        return Err("password must be at most 128 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn test_salted_hashes_differ() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-password", &a));
        assert!(verify_password("same-password", &b));
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(!verify_password("password", "not-a-valid-hash"));
        assert!(!verify_password("password", ""));
    }

    #[test]
    fn test_password_length_rules() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("비밀번호여섯").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }
}
