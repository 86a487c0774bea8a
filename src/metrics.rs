//! In-process counters and latency statistics for the inference core.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the serving pipeline
#[derive(Debug)]
pub struct ServiceMetrics {
    /// Total predictions served
    pub predictions: AtomicU64,
    /// Total explanations served
    pub explanations: AtomicU64,
    /// Predictions that needed a `class_<i>` fallback label
    pub fallback_labels: AtomicU64,
    /// Prediction latencies (in microseconds)
    predict_times: RwLock<Vec<u64>>,
    /// Explanation latencies (in microseconds)
    explain_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            explanations: AtomicU64::new(0),
            fallback_labels: AtomicU64::new(0),
            predict_times: RwLock::new(Vec::with_capacity(1000)),
            explain_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, latency: Duration, used_fallback: bool) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if used_fallback {
            self.fallback_labels.fetch_add(1, Ordering::Relaxed);
        }
        Self::push_latency(&self.predict_times, latency);
    }

    /// Record a served explanation
    pub fn record_explanation(&self, latency: Duration) {
        self.explanations.fetch_add(1, Ordering::Relaxed);
        Self::push_latency(&self.explain_times, latency);
    }

    fn push_latency(times: &RwLock<Vec<u64>>, latency: Duration) {
        if let Ok(mut times) = times.write() {
            times.push(latency.as_micros() as u64);
            // Keep only the most recent samples for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Prediction latency statistics
    pub fn predict_stats(&self) -> LatencyStats {
        Self::stats(&self.predict_times)
    }

    /// Explanation latency statistics
    pub fn explain_stats(&self) -> LatencyStats {
        Self::stats(&self.explain_times)
    }

    fn stats(times: &RwLock<Vec<u64>>) -> LatencyStats {
        let times = match times.read() {
            Ok(times) if !times.is_empty() => times,
            _ => return LatencyStats::default(),
        };

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Requests per second since startup, predictions and explanations
    /// combined
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let total = self.predictions.load(Ordering::Relaxed)
                + self.explanations.load(Ordering::Relaxed);
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let explanations = self.explanations.load(Ordering::Relaxed);
        let fallbacks = self.fallback_labels.load(Ordering::Relaxed);
        let predict = self.predict_stats();
        let explain = self.explain_stats();

        info!(
            predictions,
            explanations,
            fallback_labels = fallbacks,
            throughput = format!("{:.2} req/s", self.throughput()),
            "Service metrics summary"
        );
        if predict.count > 0 {
            info!(
                mean_us = predict.mean_us,
                p50_us = predict.p50_us,
                p95_us = predict.p95_us,
                max_us = predict.max_us,
                "Prediction latency (us)"
            );
        }
        if explain.count > 0 {
            info!(
                mean_us = explain.mean_us,
                p50_us = explain.p50_us,
                p95_us = explain.p95_us,
                max_us = explain.max_us,
                "Explanation latency (us)"
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics over the retained samples
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}
