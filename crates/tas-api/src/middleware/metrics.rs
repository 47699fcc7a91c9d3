//! # Request Metrics
//!
//! Every request bumps the in-process [`ApiMetrics`] counters and the
//! `metrics` facade counters `tas_http_requests_total` and
//! `tas_http_errors_total`, labelled by method and status. The facade
//! counters reach Prometheus only when `main` installs a recorder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Shared request counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    /// Counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests served.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests answered with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Prometheus text rendering of the in-process counters.
    pub fn render(&self) -> String {
        format!(
            "# TYPE tas_http_requests_total counter\ntas_http_requests_total {}\n\
             # TYPE tas_http_errors_total counter\ntas_http_errors_total {}\n",
            self.requests(),
            self.errors()
        )
    }

    fn record(&self, method: &str, status: u16) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let is_error = status >= 400;
        let status = status.to_string();
        metrics::counter!("tas_http_requests_total", "method" => method.to_string(), "status" => status.clone())
            .increment(1);
        if is_error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("tas_http_errors_total", "method" => method.to_string(), "status" => status).increment(1);
        }
    }
}

/// Middleware that records each response in the [`ApiMetrics`] extension.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().clone();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record(method.as_str(), response.status().as_u16());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_count_as_requests_too() {
        let m = ApiMetrics::new();
        m.record("POST", 200);
        m.record("POST", 409);
        m.record("GET", 502);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
        assert!(m.render().contains("tas_http_errors_total 2"));
    }

    #[test]
    fn clones_share_counters() {
        let a = ApiMetrics::new();
        let b = a.clone();
        b.record("GET", 200);
        assert_eq!(a.requests(), 1);
    }
}
