//! Backpressure-aware event sink implementation.

use super::EventSink;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::core::CdEvent;
use crate::errors::SinkError;

/// Metrics for backpressure monitoring.
#[derive(Debug, Default)]
pub struct BackpressureMetrics {
    /// Number of events accepted into the queue.
    enqueued: AtomicU64,
    /// Number of events dropped because the queue was full.
    dropped: AtomicU64,
    /// Number of events the downstream sink accepted.
    delivered: AtomicU64,
    /// Number of events the downstream sink rejected.
    failed: AtomicU64,
    /// Last drop time.
    last_drop_time: RwLock<Option<Instant>>,
}

impl BackpressureMetrics {
    /// Records an accepted event.
    pub fn record_enqueue(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped event.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        *self.last_drop_time.write() = Some(Instant::now());
    }

    /// Records a downstream delivery result.
    pub fn record_delivery(&self, ok: bool) {
        if ok {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the number of enqueued events.
    #[must_use]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Returns the number of dropped events.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns the number of delivered events.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Returns the number of failed deliveries.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Time since the last drop, if any event was ever dropped.
    #[must_use]
    pub fn since_last_drop(&self) -> Option<std::time::Duration> {
        self.last_drop_time.read().map(|t| t.elapsed())
    }

    /// Returns the drop rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_rate(&self) -> f64 {
        let enqueued = self.enqueued();
        let dropped = self.dropped();
        let total = enqueued + dropped;
        if total == 0 {
            0.0
        } else {
            (dropped as f64 / total as f64) * 100.0
        }
    }

    /// Converts metrics to a JSON object.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "enqueued": self.enqueued(),
            "dropped": self.dropped(),
            "delivered": self.delivered(),
            "failed": self.failed(),
            "drop_rate_percent": (self.drop_rate() * 100.0).round() / 100.0
        })
    }
}

/// A sink that queues events in front of a slower downstream sink.
///
/// `publish` never waits: it enqueues or drops. A background worker drains
/// the queue into the downstream sink's `deliver`.
pub struct BackpressureAwareEventSink {
    downstream: Arc<dyn EventSink>,
    tx: mpsc::Sender<CdEvent>,
    rx: Mutex<Option<mpsc::Receiver<CdEvent>>>,
    max_queue_size: usize,
    metrics: Arc<BackpressureMetrics>,
    shutdown: Arc<Notify>,
    worker_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl BackpressureAwareEventSink {
    /// Creates a new backpressure-aware sink. Call [`start`](Self::start)
    /// before publishing.
    #[must_use]
    pub fn new(downstream: Arc<dyn EventSink>, max_queue_size: usize) -> Arc<Self> {
        let capacity = max_queue_size.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        Arc::new(Self {
            downstream,
            tx,
            rx: Mutex::new(Some(rx)),
            max_queue_size: capacity,
            metrics: Arc::new(BackpressureMetrics::default()),
            shutdown: Arc::new(Notify::new()),
            worker_handle: Mutex::new(None),
        })
    }

    /// Starts the background worker on the current tokio runtime.
    ///
    /// Calling it again while the worker is running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), SinkError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SinkError::Unavailable(format!("no tokio runtime: {e}")))?;
        self.start_on(&runtime);
        Ok(())
    }

    /// Starts the background worker on `runtime`, from any thread.
    ///
    /// Calling it again while the worker is running is a no-op.
    pub fn start_on(&self, runtime: &tokio::runtime::Handle) {
        let Some(mut receiver) = self.rx.lock().take() else {
            return;
        };

        let downstream = Arc::clone(&self.downstream);
        let metrics = Arc::clone(&self.metrics);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = runtime.spawn(async move {
            loop {
                tokio::select! {
                    msg = receiver.recv() => match msg {
                        Some(event) => forward(downstream.as_ref(), &metrics, &event).await,
                        None => break,
                    },
                    () = shutdown.notified() => {
                        // Drain what is already queued, then stop.
                        while let Ok(event) = receiver.try_recv() {
                            forward(downstream.as_ref(), &metrics, &event).await;
                        }
                        break;
                    }
                }
            }
        });

        *self.worker_handle.lock() = Some(handle);
    }

    /// Stops the worker after it drains the events already queued.
    pub async fn stop(&self) {
        let handle = self.worker_handle.lock().take();
        if let Some(handle) = handle {
            self.shutdown.notify_one();
            let _ = handle.await;
        }
    }

    /// Returns the current queue size.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.max_queue_size - self.tx.capacity()
    }

    /// Returns whether the worker is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker_handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> &BackpressureMetrics {
        &self.metrics
    }
}

async fn forward(downstream: &dyn EventSink, metrics: &BackpressureMetrics, event: &CdEvent) {
    match downstream.deliver(event).await {
        Ok(()) => metrics.record_delivery(true),
        Err(err) => {
            metrics.record_delivery(false);
            warn!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                error = %err,
                "Queued CDEvent delivery failed"
            );
        }
    }
}

#[async_trait]
impl EventSink for BackpressureAwareEventSink {
    fn publish(&self, event: &CdEvent) -> Result<(), SinkError> {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {
                self.metrics.record_enqueue();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_drop();
                debug!(
                    event_type = %event.event_type(),
                    queue_size = %self.queue_size(),
                    dropped_total = %self.metrics.dropped(),
                    "Event dropped due to backpressure"
                );
                Err(SinkError::QueueFull {
                    capacity: self.max_queue_size,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.record_drop();
                Err(SinkError::Unavailable("delivery queue closed".to_string()))
            }
        }
    }

    async fn deliver(&self, event: &CdEvent) -> Result<(), SinkError> {
        self.tx
            .send(event.clone())
            .await
            .map_err(|_| SinkError::Unavailable("delivery queue closed".to_string()))?;
        self.metrics.record_enqueue();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityKind, NormalizedEventPayload, TransitionKind};
    use crate::events::CollectingEventSink;
    use crate::testing::FailingEventSink;
    use chrono::Utc;

    fn event(id: &str) -> CdEvent {
        let payload = NormalizedEventPayload::new("job", "1");
        CdEvent::from_payload(
            id,
            "test",
            Utc::now(),
            EntityKind::PipelineRun,
            TransitionKind::Started,
            &payload,
        )
        .unwrap()
    }

    #[test]
    fn test_metrics_default() {
        let metrics = BackpressureMetrics::default();
        assert_eq!(metrics.enqueued(), 0);
        assert_eq!(metrics.dropped(), 0);
        assert_eq!(metrics.drop_rate(), 0.0);
        assert!(metrics.since_last_drop().is_none());
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = BackpressureMetrics::default();

        metrics.record_enqueue();
        metrics.record_enqueue();
        metrics.record_drop();

        assert_eq!(metrics.enqueued(), 2);
        assert_eq!(metrics.dropped(), 1);
        assert!((metrics.drop_rate() - 33.333).abs() < 1.0);
        assert!(metrics.since_last_drop().is_some());
    }

    #[test]
    fn test_metrics_to_dict() {
        let metrics = BackpressureMetrics::default();
        metrics.record_enqueue();
        metrics.record_delivery(false);

        let dict = metrics.to_dict();
        assert_eq!(dict["enqueued"], 1);
        assert_eq!(dict["failed"], 1);
        assert_eq!(dict["dropped"], 0);
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let sink = BackpressureAwareEventSink::new(Arc::new(CollectingEventSink::new()), 4);
        assert!(matches!(sink.start(), Err(SinkError::Unavailable(_))));
    }

    #[test]
    fn test_start_on_from_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let downstream = Arc::new(CollectingEventSink::new());
        let sink = BackpressureAwareEventSink::new(downstream.clone(), 8);
        sink.start_on(runtime.handle());

        sink.publish(&event("a")).unwrap();
        runtime.block_on(sink.stop());

        assert_eq!(downstream.len(), 1);
        assert_eq!(sink.metrics().delivered(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let downstream = Arc::new(CollectingEventSink::new());
        let sink = BackpressureAwareEventSink::new(downstream, 1);

        // Worker not started, so the queue never drains.
        assert!(sink.publish(&event("a")).is_ok());
        let err = sink.publish(&event("b")).unwrap_err();

        assert_eq!(err, SinkError::QueueFull { capacity: 1 });
        assert_eq!(sink.queue_size(), 1);
        assert_eq!(sink.metrics().dropped(), 1);
    }

    #[tokio::test]
    async fn test_worker_drains_into_downstream() {
        let downstream = Arc::new(CollectingEventSink::new());
        let sink = BackpressureAwareEventSink::new(downstream.clone(), 16);
        sink.start().unwrap();
        assert!(sink.is_running());

        for id in ["a", "b", "c"] {
            sink.publish(&event(id)).unwrap();
        }
        sink.stop().await;

        let ids: Vec<String> = downstream.events().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(sink.metrics().delivered(), 3);
        assert!(!sink.is_running());
    }

    #[tokio::test]
    async fn test_downstream_failures_are_counted() {
        let downstream = Arc::new(FailingEventSink::new(SinkError::Rejected { status: 500 }));
        let sink = BackpressureAwareEventSink::new(downstream, 4);
        sink.start().unwrap();

        sink.publish(&event("a")).unwrap();
        sink.stop().await;

        assert_eq!(sink.metrics().failed(), 1);
        assert_eq!(sink.metrics().delivered(), 0);
    }
}
