//! Gateway performance and decision metrics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the security gateway
pub struct GatewayMetrics {
    /// Requests that passed every gate
    pub requests_allowed: AtomicU64,
    /// Requests rejected by some gate
    pub requests_denied: AtomicU64,
    /// Security events appended
    pub events_appended: AtomicU64,
    /// Alerts raised by the anomaly engine
    pub alerts_raised: AtomicU64,
    /// Denials by gate (rate_limited, unauthenticated, ...)
    denials_by_reason: RwLock<HashMap<String, u64>>,
    /// Request handling times (in microseconds)
    handling_times: RwLock<Vec<u64>>,
    /// Start time for throughput calculation
    start_time: Instant,
}

impl GatewayMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_allowed: AtomicU64::new(0),
            requests_denied: AtomicU64::new(0),
            events_appended: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            denials_by_reason: RwLock::new(HashMap::new()),
            handling_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a request that passed every gate
    pub fn record_allowed(&self, handling_time: Duration) {
        self.requests_allowed.fetch_add(1, Ordering::Relaxed);
        self.record_time(handling_time);
    }

    /// Record a request rejected by a gate
    pub fn record_denied(&self, reason: &str, handling_time: Duration) {
        self.requests_denied.fetch_add(1, Ordering::Relaxed);
        self.record_time(handling_time);

        if let Ok(mut by_reason) = self.denials_by_reason.write() {
            *by_reason.entry(reason.to_string()).or_insert(0) += 1;
        }
    }

    /// Record an appended security event
    pub fn record_event(&self) {
        self.events_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a raised alert
    pub fn record_alert(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    fn record_time(&self, handling_time: Duration) {
        if let Ok(mut times) = self.handling_times.write() {
            times.push(handling_time.as_micros() as u64);
            // Keep only the most recent samples for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get handling time statistics
    pub fn get_handling_stats(&self) -> HandlingStats {
        let times = self.handling_times.read().unwrap();
        if times.is_empty() {
            return HandlingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        HandlingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get denials broken down by gate
    pub fn get_denials_by_reason(&self) -> HashMap<String, u64> {
        self.denials_by_reason.read().unwrap().clone()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let total = self.requests_allowed.load(Ordering::Relaxed)
                + self.requests_denied.load(Ordering::Relaxed);
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let allowed = self.requests_allowed.load(Ordering::Relaxed);
        let denied = self.requests_denied.load(Ordering::Relaxed);
        let total = allowed + denied;
        let denial_rate = if total > 0 {
            (denied as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let handling = self.get_handling_stats();
        let throughput = self.get_throughput();
        let denials = self.get_denials_by_reason();
        let events = self.events_appended.load(Ordering::Relaxed);
        let alerts = self.alerts_raised.load(Ordering::Relaxed);

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            SECURITY GATEWAY - METRICS SUMMARY                ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Handled: {:>10}  │  Throughput: {:>7.1} req/s   ║",
            total, throughput
        );
        info!(
            "║ Denied:           {:>10}  │  Denial Rate: {:>6.1}%        ║",
            denied, denial_rate
        );
        info!(
            "║ Events Appended:  {:>10}  │  Alerts Raised: {:>8}     ║",
            events, alerts
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Handling Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}  ║",
            handling.mean_us, handling.p50_us, handling.p95_us, handling.p99_us
        );
        if !denials.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Denials by Gate:                                             ║");
            for (reason, count) in &denials {
                let pct = if denied > 0 {
                    (*count as f64 / denied as f64) * 100.0
                } else {
                    0.0
                };
                info!(
                    "║   {:18}: {:>6} ({:>5.1}%)                        ║",
                    reason, count, pct
                );
            }
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request handling time statistics
#[derive(Debug, Default)]
pub struct HandlingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: std::sync::Arc<GatewayMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<GatewayMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = GatewayMetrics::new();

        metrics.record_allowed(Duration::from_micros(100));
        metrics.record_denied("rate_limited", Duration::from_micros(50));
        metrics.record_denied("permission_denied", Duration::from_micros(60));
        metrics.record_event();
        metrics.record_alert();

        assert_eq!(metrics.requests_allowed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_denied.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.events_appended.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.alerts_raised.load(Ordering::Relaxed), 1);

        let by_reason = metrics.get_denials_by_reason();
        assert_eq!(by_reason.get("rate_limited"), Some(&1));
        assert_eq!(by_reason.get("permission_denied"), Some(&1));
    }

    #[test]
    fn test_handling_stats() {
        let metrics = GatewayMetrics::new();

        for us in [100, 200, 300, 400] {
            metrics.record_allowed(Duration::from_micros(us));
        }

        let stats = metrics.get_handling_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
