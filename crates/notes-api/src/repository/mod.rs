//! 저장소 구현.
//!
//! [`notes_core::Store`] trait의 두 가지 구현을 제공합니다.
//!
//! - [`PgStore`]: PostgreSQL (sqlx). `DATABASE_URL`이 설정된 경우 사용
//! - [`MemoryStore`]: 프로세스 내부 메모리. 테스트와 DB 없는 로컬 실행용

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;
