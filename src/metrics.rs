//! Rolling operational metrics.
//!
//! One process-wide collector records ping and request samples into two
//! fixed-capacity FIFO rings, one per sample kind. `record` and
//! `snapshot` share a short internal lock, so concurrent request
//! handlers never lose samples and a snapshot always sees a consistent
//! view. The handle is passed explicitly wherever samples are recorded;
//! there is no global registry.
//!
//! The ping loop is an independent interval task that measures a small
//! liveness probe (a scheduler yield plus a corpus stats read) until its
//! cancellation token fires.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::corpus::CorpusStore;

/// Number of raw samples echoed in a snapshot.
const LAST_SAMPLES: usize = 20;

/// What a sample measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Ping,
    Request,
}

/// One recorded ping or request-completion event.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    pub kind: SampleKind,
    pub at: DateTime<Utc>,
    pub duration_ms: f64,
    /// Tool name for request samples; absent for pings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub ok: bool,
    /// Set when a request failed specifically by exceeding its deadline.
    pub timed_out: bool,
}

impl MetricSample {
    pub fn ping(duration: Duration) -> Self {
        Self {
            kind: SampleKind::Ping,
            at: Utc::now(),
            duration_ms: duration.as_secs_f64() * 1000.0,
            tool: None,
            ok: true,
            timed_out: false,
        }
    }

    pub fn request(tool: &str, duration: Duration, ok: bool, timed_out: bool) -> Self {
        Self {
            kind: SampleKind::Request,
            at: Utc::now(),
            duration_ms: duration.as_secs_f64() * 1000.0,
            tool: Some(tool.to_string()),
            ok,
            timed_out,
        }
    }
}

/// Aggregate view returned by `GET /metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Mean latency over every retained ping sample, in milliseconds.
    pub ping_latency_rolling_avg_ms: f64,
    /// Requests recorded within the configured rate interval.
    pub requests_per_interval: usize,
    pub rate_interval_secs: u64,
    pub window_capacity: usize,
    pub ping_samples: usize,
    pub request_samples: usize,
    pub requests_ok: usize,
    pub requests_failed: usize,
    pub requests_timed_out: usize,
    /// Most recent samples of either kind, newest first.
    pub last_samples: Vec<MetricSample>,
}

struct Rings {
    pings: VecDeque<MetricSample>,
    requests: VecDeque<MetricSample>,
}

/// Cloneable handle to the process-wide collector.
#[derive(Clone)]
pub struct MetricsHandle {
    inner: Arc<Mutex<Rings>>,
    capacity: usize,
    rate_interval: Duration,
}

impl MetricsHandle {
    /// Collector with empty rings. `capacity` bounds each ring
    /// separately; once full, the oldest sample of that kind is evicted.
    pub fn new(capacity: usize, rate_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Rings {
                pings: VecDeque::with_capacity(capacity),
                requests: VecDeque::with_capacity(capacity),
            })),
            capacity,
            rate_interval,
        }
    }

    /// Record one sample. FIFO eviction, never blocking beyond the short
    /// critical section.
    pub fn record(&self, sample: MetricSample) {
        let mut rings = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let ring = match sample.kind {
            SampleKind::Ping => &mut rings.pings,
            SampleKind::Request => &mut rings.requests,
        };
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(sample);
    }

    /// Consistent copy of the aggregate state. The rings are cloned
    /// under the lock and aggregated outside it.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (pings, requests) = {
            let rings = match self.inner.lock() {
                Ok(guard) => guard,
                Err(_) => return self.empty_snapshot(),
            };
            (rings.pings.clone(), rings.requests.clone())
        };

        let ping_latency_rolling_avg_ms = if pings.is_empty() {
            0.0
        } else {
            pings.iter().map(|s| s.duration_ms).sum::<f64>() / pings.len() as f64
        };

        let now = Utc::now();
        let horizon = chrono::Duration::from_std(self.rate_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let requests_per_interval = requests.iter().filter(|s| now - s.at <= horizon).count();
        let requests_ok = requests.iter().filter(|s| s.ok).count();
        let requests_timed_out = requests.iter().filter(|s| s.timed_out).count();

        let mut last_samples: Vec<MetricSample> =
            pings.iter().chain(requests.iter()).cloned().collect();
        last_samples.sort_by(|a, b| b.at.cmp(&a.at));
        last_samples.truncate(LAST_SAMPLES);

        MetricsSnapshot {
            ping_latency_rolling_avg_ms,
            requests_per_interval,
            rate_interval_secs: self.rate_interval.as_secs(),
            window_capacity: self.capacity,
            ping_samples: pings.len(),
            request_samples: requests.len(),
            requests_ok,
            requests_failed: requests.len() - requests_ok,
            requests_timed_out,
            last_samples,
        }
    }

    fn empty_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ping_latency_rolling_avg_ms: 0.0,
            requests_per_interval: 0,
            rate_interval_secs: self.rate_interval.as_secs(),
            window_capacity: self.capacity,
            ping_samples: 0,
            request_samples: 0,
            requests_ok: 0,
            requests_failed: 0,
            requests_timed_out: 0,
            last_samples: Vec::new(),
        }
    }
}

/// Spawn the liveness ping task. Each tick times a scheduler yield plus
/// a corpus stats read and records it as a ping sample; the task stops
/// when `shutdown` is cancelled.
pub fn spawn_ping_loop(
    metrics: MetricsHandle,
    corpus: Arc<CorpusStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("ping loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let started = Instant::now();
                    tokio::task::yield_now().await;
                    let stats = corpus.stats();
                    let elapsed = started.elapsed();
                    metrics.record(MetricSample::ping(elapsed));
                    tracing::trace!(
                        passages = stats.passages,
                        latency_ms = elapsed.as_secs_f64() * 1000.0,
                        "ping"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMeta;

    fn handle(capacity: usize) -> MetricsHandle {
        MetricsHandle::new(capacity, Duration::from_secs(60))
    }

    #[test]
    fn test_ring_capacity_enforced() {
        let metrics = handle(16);
        for _ in 0..1000 {
            metrics.record(MetricSample::request("t", Duration::from_millis(1), true, false));
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.request_samples, 16);
        assert_eq!(snap.ping_samples, 0);
    }

    #[test]
    fn test_fifo_eviction_order() {
        let metrics = handle(5);
        for i in 0..8u64 {
            metrics.record(MetricSample::request("t", Duration::from_millis(i), true, false));
        }
        let rings = metrics.inner.lock().unwrap();
        let kept: Vec<u64> = rings.requests.iter().map(|s| s.duration_ms as u64).collect();
        assert_eq!(kept, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_kinds_use_separate_rings() {
        let metrics = handle(4);
        for _ in 0..10 {
            metrics.record(MetricSample::ping(Duration::from_millis(2)));
        }
        metrics.record(MetricSample::request("t", Duration::from_millis(1), true, false));
        let snap = metrics.snapshot();
        assert_eq!(snap.ping_samples, 4);
        assert_eq!(snap.request_samples, 1);
    }

    #[test]
    fn test_ping_average() {
        let metrics = handle(8);
        metrics.record(MetricSample::ping(Duration::from_millis(10)));
        metrics.record(MetricSample::ping(Duration::from_millis(30)));
        let snap = metrics.snapshot();
        assert!((snap.ping_latency_rolling_avg_ms - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_requests_per_interval_excludes_old_samples() {
        let metrics = handle(8);
        metrics.record(MetricSample::request("t", Duration::from_millis(1), true, false));
        let mut stale = MetricSample::request("t", Duration::from_millis(1), true, false);
        stale.at = Utc::now() - chrono::Duration::hours(1);
        metrics.record(stale);
        let snap = metrics.snapshot();
        assert_eq!(snap.request_samples, 2);
        assert_eq!(snap.requests_per_interval, 1);
    }

    #[test]
    fn test_outcome_counters() {
        let metrics = handle(8);
        metrics.record(MetricSample::request("t", Duration::from_millis(1), true, false));
        metrics.record(MetricSample::request("t", Duration::from_millis(1), false, false));
        metrics.record(MetricSample::request("t", Duration::from_millis(1), false, true));
        let snap = metrics.snapshot();
        assert_eq!(snap.requests_ok, 1);
        assert_eq!(snap.requests_failed, 2);
        assert_eq!(snap.requests_timed_out, 1);
    }

    #[test]
    fn test_concurrent_recording_loses_nothing() {
        let metrics = handle(1000);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let metrics = metrics.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    metrics.record(MetricSample::request(
                        "t",
                        Duration::from_millis(1),
                        true,
                        false,
                    ));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().request_samples, 800);
    }

    #[tokio::test]
    async fn test_ping_loop_records_and_stops() {
        let corpus = Arc::new(crate::corpus::CorpusStore::from_documents(
            vec![crate::corpus::make_document(
                "a",
                "A",
                "Some text.",
                DocumentMeta::default(),
            )],
            100,
        ));
        let metrics = handle(16);
        let shutdown = CancellationToken::new();
        let task = spawn_ping_loop(
            metrics.clone(),
            corpus,
            Duration::from_millis(10),
            shutdown.clone(),
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown.cancel();
        task.await.unwrap();
        let snap = metrics.snapshot();
        assert!(snap.ping_samples >= 1);
        let after = snap.ping_samples;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(metrics.snapshot().ping_samples, after);
    }
}
