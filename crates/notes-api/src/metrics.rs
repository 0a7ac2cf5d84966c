//! Prometheus 메트릭.
//!
//! 요청 메트릭은 라우트 패턴(`/api/v1/notes/{id}`) 단위로 집계되어 라벨 수가 자원 수에 비례해 늘지 않습니다.
//! 수집된 값은 바이너리가 노출하는 `/metrics`에서 텍스트 형식으로 읽습니다.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const REQUESTS_TOTAL: &str = "http_requests_total";
const RESPONSES_TOTAL: &str = "http_responses_total";
const REQUEST_DURATION: &str = "http_request_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// 전역 Prometheus 레코더를 설치하고 렌더링 핸들을 반환합니다.
///
/// 프로세스당 한 번만 성공합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install_recorder()
}

/// 요청 하나에 붙는 메트릭 라벨.
#[derive(Debug, Clone)]
pub struct RequestLabels {
    method: String,
    route: String,
}

impl RequestLabels {
    pub fn new(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route: route.into(),
        }
    }

    /// 요청 수신.
    pub fn record_received(&self) {
        counter!(REQUESTS_TOTAL, "method" => self.method.clone(), "path" => self.route.clone())
            .increment(1);
    }

    /// 응답 상태와 처리 시간.
    pub fn record_completed(&self, status: u16, elapsed: Duration) {
        counter!(
            RESPONSES_TOTAL,
            "method" => self.method.clone(),
            "path" => self.route.clone(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!(
            REQUEST_DURATION,
            "method" => self.method.clone(),
            "path" => self.route.clone()
        )
        .record(elapsed.as_secs_f64());
    }
}

/// 로그인 시도 결과.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("notes_logins_total", "outcome" => outcome).increment(1);
}

/// 첨부파일 업로드 건수와 누적 바이트.
pub fn record_attachment_upload(bytes: usize) {
    counter!("notes_attachment_uploads_total").increment(1);
    counter!("notes_attachment_bytes_total").increment(bytes as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_labels_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let labels = RequestLabels::new("GET", "/api/v1/notes/{id}");
            labels.record_received();
            labels.record_completed(404, Duration::from_millis(3));
            record_login(false);
        });

        let rendered = handle.render();
        assert!(rendered.contains(REQUESTS_TOTAL));
        assert!(rendered.contains(r#"path="/api/v1/notes/{id}""#));
        assert!(rendered.contains(r#"status="404""#));
        assert!(rendered.contains(r#"notes_logins_total{outcome="failure"} 1"#));
    }
}
