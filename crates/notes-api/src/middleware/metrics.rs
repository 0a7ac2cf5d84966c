//! 요청 단위 메트릭 수집 미들웨어.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::RequestLabels;

/// 라우트에 매칭되지 않은 요청의 `path` 라벨.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// 요청 수, 응답 상태별 수, 처리 시간을 기록합니다.
///
/// `path` 라벨은 매칭된 라우트 패턴입니다. 매칭되지 않은 요청은 모두 [`UNMATCHED_ROUTE`] 하나로 묶어
/// 임의 URL 요청이 시계열을 늘리지 않게 합니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let started = Instant::now();

    let labels = RequestLabels::new(request.method().as_str(), route_label(&request));
    labels.record_received();

    let response = next.run(request).await;
    labels.record_completed(response.status().as_u16(), started.elapsed());

    response
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |matched| matched.as_str().to_string())
}
