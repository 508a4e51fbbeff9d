//! Metrics collection and reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time copy of the collector's counters
#[derive(Debug, Clone)]
pub struct SystemMetrics {
    pub total_requests: u64,
    pub total_errors: u64,
    pub canned_answers: u64,
    pub arithmetic_shortcuts: u64,
    pub cache_hits: u64,
    pub remote_completions: u64,

    /// Average end-to-end request time (ms)
    pub avg_response_time_ms: f64,

    pub uptime_secs: u64,
}

/// Latency histogram buckets (in milliseconds)
const LATENCY_BUCKETS: &[f64] = &[5.0, 25.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0];

/// Cumulative latency histogram
#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<(f64, Arc<AtomicU64>)>,
    sum: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    fn new(buckets: &[f64]) -> Self {
        Self {
            buckets: buckets
                .iter()
                .map(|&b| (b, Arc::new(AtomicU64::new(0))))
                .collect(),
            sum: Arc::new(AtomicU64::new(0)),
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    fn observe(&self, value_ms: f64) {
        self.sum.fetch_add(value_ms as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (bucket, counter) in &self.buckets {
            if value_ms <= *bucket {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn export_prometheus(&self, name: &str, help: &str) -> String {
        let mut output = format!("# HELP {} {}\n# TYPE {} histogram\n", name, help, name);

        for (bucket, counter) in &self.buckets {
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                name,
                bucket,
                counter.load(Ordering::Relaxed)
            ));
        }

        let total_count = self.count.load(Ordering::Relaxed);
        output.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, total_count));
        output.push_str(&format!(
            "{}_sum {:.3}\n",
            name,
            self.sum.load(Ordering::Relaxed) as f64
        ));
        output.push_str(&format!("{}_count {}\n", name, total_count));

        output
    }
}

/// Process-wide request counters, shared by the pipeline and the handlers
pub struct MetricsCollector {
    start_time: Instant,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    total_response_time_ms: AtomicU64,
    canned_answers: AtomicU64,
    arithmetic_shortcuts: AtomicU64,
    cache_hits: AtomicU64,
    remote_completions: AtomicU64,

    request_latency: Histogram,
    completion_latency: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_response_time_ms: AtomicU64::new(0),
            canned_answers: AtomicU64::new(0),
            arithmetic_shortcuts: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            remote_completions: AtomicU64::new(0),
            request_latency: Histogram::new(LATENCY_BUCKETS),
            completion_latency: Histogram::new(LATENCY_BUCKETS),
        }
    }

    /// Record a finished request
    pub fn record_request(&self, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let ms = response_time.as_millis() as u64;
        self.total_response_time_ms.fetch_add(ms, Ordering::Relaxed);
        self.request_latency.observe(ms as f64);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_canned(&self) {
        self.canned_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_arithmetic(&self) {
        self.arithmetic_shortcuts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one upstream completion attempt, successful or not
    pub fn record_completion(&self, duration: Duration) {
        self.remote_completions.fetch_add(1, Ordering::Relaxed);
        self.completion_latency.observe(duration.as_millis() as f64);
    }

    pub fn get_metrics(&self) -> SystemMetrics {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time_ms.load(Ordering::Relaxed);

        let avg_response_time_ms = if total_requests > 0 {
            total_response_time as f64 / total_requests as f64
        } else {
            0.0
        };

        SystemMetrics {
            total_requests,
            total_errors: self.total_errors.load(Ordering::Relaxed),
            canned_answers: self.canned_answers.load(Ordering::Relaxed),
            arithmetic_shortcuts: self.arithmetic_shortcuts.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            remote_completions: self.remote_completions.load(Ordering::Relaxed),
            avg_response_time_ms,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Export metrics in Prometheus text format. `tokens_saved_total` comes from the
    /// savings accountant, which owns the running total.
    pub fn export_prometheus(&self, tokens_saved_total: i64) -> String {
        let metrics = self.get_metrics();

        let mut output = format!(
            "# HELP sustain_requests_total Total number of prompt requests\n\
             # TYPE sustain_requests_total counter\n\
             sustain_requests_total {}\n\
             \n\
             # HELP sustain_errors_total Total number of failed prompt requests\n\
             # TYPE sustain_errors_total counter\n\
             sustain_errors_total {}\n\
             \n\
             # HELP sustain_canned_answers_total Prompts answered with the canned description\n\
             # TYPE sustain_canned_answers_total counter\n\
             sustain_canned_answers_total {}\n\
             \n\
             # HELP sustain_arithmetic_shortcuts_total Prompts answered by local arithmetic\n\
             # TYPE sustain_arithmetic_shortcuts_total counter\n\
             sustain_arithmetic_shortcuts_total {}\n\
             \n\
             # HELP sustain_cache_hits_total Prompts answered from the response cache\n\
             # TYPE sustain_cache_hits_total counter\n\
             sustain_cache_hits_total {}\n\
             \n\
             # HELP sustain_remote_completions_total Upstream completion attempts\n\
             # TYPE sustain_remote_completions_total counter\n\
             sustain_remote_completions_total {}\n\
             \n\
             # HELP sustain_tokens_saved_total Running total of estimated tokens saved\n\
             # TYPE sustain_tokens_saved_total gauge\n\
             sustain_tokens_saved_total {}\n\
             \n\
             # HELP sustain_avg_response_time_ms Average response time in milliseconds\n\
             # TYPE sustain_avg_response_time_ms gauge\n\
             sustain_avg_response_time_ms {:.2}\n\
             \n\
             # HELP sustain_uptime_seconds Uptime in seconds\n\
             # TYPE sustain_uptime_seconds counter\n\
             sustain_uptime_seconds {}\n\
             \n",
            metrics.total_requests,
            metrics.total_errors,
            metrics.canned_answers,
            metrics.arithmetic_shortcuts,
            metrics.cache_hits,
            metrics.remote_completions,
            tokens_saved_total,
            metrics.avg_response_time_ms,
            metrics.uptime_secs,
        );

        output.push_str(&self.request_latency.export_prometheus(
            "sustain_request_duration_ms",
            "Request duration in milliseconds",
        ));
        output.push('\n');
        output.push_str(&self.completion_latency.export_prometheus(
            "sustain_completion_duration_ms",
            "Upstream completion duration in milliseconds",
        ));

        output
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
