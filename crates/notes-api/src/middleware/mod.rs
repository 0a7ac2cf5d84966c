//! 라우터 전체에 적용하는 미들웨어.
//!
//! 신원 확인 미들웨어는 라우트 패턴이 필요하므로 [`crate::auth`]에서 `route_layer`로 따로 붙입니다.

mod metrics;

pub use metrics::metrics_layer;
