//! Refresh metrics collection and reporting
//!
//! Tracks refresh latency percentiles and how each read was served.

use crate::types::QuoteSource;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of latency samples to keep
const MAX_SAMPLES: usize = 100;

/// Snapshot of refresh metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshMetrics {
    /// Reads answered from a valid cache without any network call
    pub cache_hits: u64,
    /// Refresh attempts that reached the providers
    pub refreshes: u64,
    /// Refreshes answered by the primary provider
    pub primary_hits: u64,
    /// Refreshes answered by the secondary provider
    pub fallback_hits: u64,
    /// Refreshes where neither provider answered
    pub total_failures: u64,
    /// Callers that waited on another caller's refresh and reused it
    pub coalesced: u64,
    /// Failed cache writes
    pub persist_failures: u64,
    /// 50th percentile refresh latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile refresh latency in milliseconds
    pub latency_p99_ms: f64,
}

impl RefreshMetrics {
    /// Share of refreshes that produced quotes (1.0 when none ran)
    pub fn success_rate(&self) -> f64 {
        if self.refreshes == 0 {
            1.0
        } else {
            (self.refreshes - self.total_failures) as f64 / self.refreshes as f64
        }
    }
}

/// Collects refresh metrics for the aggregator
#[derive(Default)]
pub struct MetricsCollector {
    /// Rolling window of refresh latencies in milliseconds
    samples: Arc<RwLock<VecDeque<f64>>>,
    counters: Arc<RwLock<RefreshMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_cache_hit(&self) {
        self.counters.write().await.cache_hits += 1;
    }

    pub async fn record_coalesced(&self) {
        self.counters.write().await.coalesced += 1;
    }

    pub async fn record_persist_failure(&self) {
        self.counters.write().await.persist_failures += 1;
    }

    /// Records a refresh with its latency and the source that answered
    pub async fn record_refresh(&self, duration: Duration, source: Option<QuoteSource>) {
        {
            let mut counters = self.counters.write().await;
            counters.refreshes += 1;
            match source {
                Some(QuoteSource::Primary) => counters.primary_hits += 1,
                Some(QuoteSource::Secondary) => counters.fallback_hits += 1,
                None => counters.total_failures += 1,
            }
        }

        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(duration.as_secs_f64() * 1000.0);
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> RefreshMetrics {
        let mut metrics = self.counters.read().await.clone();

        let mut latencies: Vec<f64> = self.samples.read().await.iter().copied().collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        metrics.latency_p50_ms = percentile(&latencies, 50.0);
        metrics.latency_p99_ms = percentile(&latencies, 99.0);
        metrics
    }
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let rank = (p / 100.0 * sorted_values.len() as f64).ceil() as usize;
    sorted_values[rank.saturating_sub(1).min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new();

        collector
            .record_refresh(Duration::from_millis(100), Some(QuoteSource::Primary))
            .await;
        collector
            .record_refresh(Duration::from_millis(200), Some(QuoteSource::Secondary))
            .await;
        collector.record_refresh(Duration::from_millis(150), None).await;
        collector.record_cache_hit().await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.refreshes, 3);
        assert_eq!(metrics.primary_hits, 1);
        assert_eq!(metrics.fallback_hits, 1);
        assert_eq!(metrics.total_failures, 1);
        assert_eq!(metrics.cache_hits, 1);
        assert!((metrics.latency_p50_ms - 150.0).abs() < 1e-6);
        assert!(metrics.success_rate() > 0.6 && metrics.success_rate() < 0.7);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
        assert_eq!(percentile(&values, 0.0), 1.0);

        assert_eq!(percentile(&[4.0], 50.0), 4.0);
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.0);
        assert_eq!(percentile(&[], 99.0), 0.0);
    }
}
