//! Metrics collection for observability

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry,
    register_int_gauge_with_registry,
};
use std::sync::Arc;
use std::time::Duration;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Chat API metrics
    pub chat_requests: CounterVec,
    pub chat_request_duration: Histogram,
    pub image_rejections: CounterVec,
    pub history_clears: Counter,
    pub active_sessions: IntGauge,

    // Upstream LLM metrics
    pub llm_requests: CounterVec,
    pub llm_request_duration: HistogramVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let chat_requests = register_counter_vec_with_registry!(
            Opts::new("chat_requests_total", "Total chat turns"),
            &["status"],
            registry
        )?;

        let chat_request_duration = register_histogram_with_registry!(
            "chat_request_duration_seconds",
            "Chat turn duration in seconds",
            registry
        )?;

        let image_rejections = register_counter_vec_with_registry!(
            Opts::new("image_rejections_total", "Uploads rejected by the image validator"),
            &["reason"],
            registry
        )?;

        let history_clears = register_counter_with_registry!(
            Opts::new("history_clears_total", "Total history clear requests"),
            registry
        )?;

        let active_sessions = register_int_gauge_with_registry!(
            Opts::new("active_sessions", "Sessions currently holding history"),
            registry
        )?;

        let llm_requests = register_counter_vec_with_registry!(
            Opts::new("llm_requests_total", "Total chat completion calls"),
            &["status"],
            registry
        )?;

        let llm_request_duration = register_histogram_vec_with_registry!(
            "llm_request_duration_seconds",
            "Chat completion call duration in seconds",
            &["status"],
            registry
        )?;

        Ok(Self {
            registry,
            chat_requests,
            chat_request_duration,
            image_rejections,
            history_clears,
            active_sessions,
            llm_requests,
            llm_request_duration,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a chat turn
    pub fn record_chat(&self, success: bool, elapsed: Duration) {
        let status = if success { "success" } else { "error" };
        self.chat_requests.with_label_values(&[status]).inc();
        self.chat_request_duration.observe(elapsed.as_secs_f64());
    }

    /// Record an upstream call outcome
    pub fn record_llm_request(&self, status: &str, elapsed: Duration) {
        self.llm_requests.with_label_values(&[status]).inc();
        self.llm_request_duration
            .with_label_values(&[status])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_image_rejection(&self, reason: &str) {
        self.image_rejections.with_label_values(&[reason]).inc();
    }

    pub fn record_history_clear(&self) {
        self.history_clears.inc();
    }

    pub fn set_active_sessions(&self, count: usize) {
        self.active_sessions.set(count as i64);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_and_export() {
        let metrics = Metrics::new().unwrap();
        metrics.record_chat(true, Duration::from_millis(120));
        metrics.record_chat(false, Duration::from_millis(5));
        metrics.record_llm_request("success", Duration::from_millis(100));
        metrics.record_image_rejection("unsupported");
        metrics.record_history_clear();
        metrics.set_active_sessions(3);

        let text = metrics.export_prometheus();
        assert!(text.contains("chat_requests_total{status=\"success\"} 1"));
        assert!(text.contains("image_rejections_total{reason=\"unsupported\"} 1"));
        assert!(text.contains("active_sessions 3"));
    }
}
