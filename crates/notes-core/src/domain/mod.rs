//! 노트 서비스의 도메인 모델.

mod attachment;
mod category;
mod note;
mod resource_name;
mod store;
mod tag;
mod user;
mod visibility;

pub use attachment::*;
pub use category::*;
pub use note::*;
pub use resource_name::*;
pub use store::*;
pub use tag::*;
pub use user::*;
pub use visibility::*;
