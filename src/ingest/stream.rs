// src/ingest/stream.rs
//! Producer/consumer streaming over a bounded in-process queue.
//!
//! One producer replays raw events (normalizing each) with a fixed pacing delay.
//! One consumer drains the queue and runs the handler for one item at a time.
//! Handler errors and panics are logged and the item is acknowledged anyway:
//! delivery is at-most-once, nothing is retried.

use crate::ingest::normalize_event;
use crate::ingest::types::{EventSource, NormalizedEvent, RawEvent};
use anyhow::{anyhow, bail, Context, Result};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Caller-supplied enrichment step, invoked once per consumed item.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: NormalizedEvent) -> Result<()>;
}

/// Lifecycle of a single run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    pub capacity: usize,
    pub delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            delay: Duration::from_secs(1),
        }
    }
}

/// Outcome counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub published: usize,
    pub handled: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    drained: Notify,
}

impl Pending {
    fn ack(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Publishing side of the bounded queue. Tracks unacknowledged items so the
/// orchestrator can wait for a full drain.
#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<NormalizedEvent>,
    pending: Arc<Pending>,
}

/// Consuming side of the bounded queue.
pub struct QueueReceiver {
    rx: mpsc::Receiver<NormalizedEvent>,
    pending: Arc<Pending>,
}

impl WorkQueue {
    /// Bounded FIFO queue; `capacity` of zero is bumped to one.
    pub fn bounded(capacity: usize) -> (WorkQueue, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let pending = Arc::new(Pending::default());
        (
            WorkQueue {
                tx,
                pending: pending.clone(),
            },
            QueueReceiver { rx, pending },
        )
    }

    /// Enqueue one item, suspending while the queue is full.
    pub async fn publish(&self, event: NormalizedEvent) -> Result<()> {
        self.pending.count.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(event).await.is_err() {
            self.pending.ack();
            bail!("queue receiver dropped");
        }
        Ok(())
    }

    /// Published but not yet acknowledged items.
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::Acquire)
    }

    /// Wait until every published item has been acknowledged.
    pub async fn join(&self) {
        loop {
            let notified = self.pending.drained.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl QueueReceiver {
    pub async fn recv(&mut self) -> Option<NormalizedEvent> {
        self.rx.recv().await
    }

    /// Mark one received item as processed.
    pub fn ack(&self) {
        self.pending.ack();
    }
}

/// Handler outcomes recorded by [`consume`]. Shared with the caller, which
/// reads it once the consumer is done.
#[derive(Debug, Default)]
pub struct ConsumerStats {
    handled: AtomicUsize,
    failed: AtomicUsize,
}

impl ConsumerStats {
    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Normalize and publish every raw event in order, sleeping `delay` after each.
/// Returns the number of published items. Does not close the queue.
pub async fn produce(events: Vec<RawEvent>, queue: WorkQueue, delay: Duration) -> Result<usize> {
    let mut published = 0usize;
    for raw in events {
        let event = normalize_event(&raw);
        queue.publish(event).await?;
        published += 1;
        counter!("pipeline_published_total").increment(1);
        tokio::time::sleep(delay).await;
    }
    tracing::debug!(target: "pipeline", published, "producer exhausted");
    Ok(published)
}

/// Drain the queue one handler call at a time, recording outcomes in `stats`.
/// Returns only if every publisher has been dropped.
pub async fn consume(mut rx: QueueReceiver, handler: Arc<dyn EventHandler>, stats: Arc<ConsumerStats>) {
    while let Some(event) = rx.recv().await {
        let id = event.id.clone();
        let ticker = event.ticker.clone();
        let h = handler.clone();

        // Own task so a panicking handler is contained like an error.
        let outcome = tokio::spawn(async move { h.handle(event).await }).await;
        match outcome {
            Ok(Ok(())) => {
                stats.handled.fetch_add(1, Ordering::Relaxed);
                counter!("pipeline_handled_total").increment(1);
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("pipeline_handler_errors_total").increment(1);
                tracing::warn!(target: "pipeline", ?id, ?ticker, error = ?e, "handler failed; item dropped");
            }
            Err(join) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("pipeline_handler_errors_total").increment(1);
                tracing::warn!(target: "pipeline", ?id, ?ticker, error = %join, "handler panicked; item dropped");
            }
        }
        rx.ack();
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    debug_assert!(next > *state, "pipeline state must move forward");
    tracing::debug!(target: "pipeline", from = ?*state, to = ?next, "state transition");
    *state = next;
}

/// Run one full pass over `source`: produce and consume concurrently, wait for the
/// producer, wait for the queue to drain, then cancel the consumer.
///
/// Source loading happens before anything is spawned; a failure there aborts the run.
pub async fn run_pipeline(
    source: &dyn EventSource,
    handler: Arc<dyn EventHandler>,
    cfg: StreamConfig,
) -> Result<RunReport> {
    let events = source
        .fetch_all()
        .await
        .with_context(|| format!("loading events from source `{}`", source.name()))?;
    tracing::debug!(target: "pipeline", source = source.name(), "source loaded");
    run_events(events, handler, cfg).await
}

/// Same as [`run_pipeline`] over events the caller has already loaded.
pub async fn run_events(
    events: Vec<RawEvent>,
    handler: Arc<dyn EventHandler>,
    cfg: StreamConfig,
) -> Result<RunReport> {
    crate::ingest::ensure_metrics_described();

    let mut state = PipelineState::Idle;
    tracing::info!(target: "pipeline", events = events.len(), "run starting");

    let (queue, rx) = WorkQueue::bounded(cfg.capacity);
    let stats = Arc::new(ConsumerStats::default());

    transition(&mut state, PipelineState::Running);
    let consumer = {
        let stats = stats.clone();
        tokio::spawn(consume(rx, handler, stats))
    };
    let producer = tokio::spawn(produce(events, queue.clone(), cfg.delay));

    let published = match producer.await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            consumer.abort();
            return Err(e.context("producer failed"));
        }
        Err(join) => {
            consumer.abort();
            return Err(anyhow!("producer task aborted: {join}"));
        }
    };

    transition(&mut state, PipelineState::Draining);
    queue.join().await;

    consumer.abort();
    let _ = consumer.await;
    transition(&mut state, PipelineState::Stopped);

    let report = RunReport {
        published,
        handled: stats.handled(),
        failed: stats.failed(),
    };
    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    tracing::info!(
        target: "pipeline",
        published = report.published,
        handled = report.handled,
        failed = report.failed,
        "run finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(n: i64) -> NormalizedEvent {
        NormalizedEvent {
            id: Some(serde_json::json!(n)),
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            ticker: None,
            source: String::new(),
            text: String::new(),
            sentiment: 0.0,
        }
    }

    #[tokio::test]
    async fn join_returns_immediately_when_nothing_pending() {
        let (q, _rx) = WorkQueue::bounded(4);
        q.join().await;
        assert_eq!(q.pending(), 0);
    }

    #[tokio::test]
    async fn queue_is_fifo_and_join_waits_for_acks() {
        let (q, mut rx) = WorkQueue::bounded(4);
        for n in 0..3 {
            q.publish(ev(n)).await.unwrap();
        }
        assert_eq!(q.pending(), 3);

        let waiter = {
            let q = q.clone();
            tokio::spawn(async move { q.join().await })
        };

        for n in 0..3 {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.id, Some(serde_json::json!(n)));
            rx.ack();
        }
        waiter.await.unwrap();
        assert_eq!(q.pending(), 0);
    }

    struct FailOdd;

    #[async_trait::async_trait]
    impl EventHandler for FailOdd {
        async fn handle(&self, event: NormalizedEvent) -> Result<()> {
            match event.id.as_ref().and_then(|v| v.as_i64()) {
                Some(n) if n % 2 == 1 => bail!("odd id {n}"),
                _ => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn consume_counts_outcomes_and_acks_everything() {
        let (q, rx) = WorkQueue::bounded(8);
        for n in 0..5 {
            q.publish(ev(n)).await.unwrap();
        }
        let stats = Arc::new(ConsumerStats::default());
        let consumer = tokio::spawn(consume(rx, Arc::new(FailOdd), stats.clone()));

        q.join().await;
        assert_eq!(q.pending(), 0);
        drop(q);
        consumer.await.unwrap();

        assert_eq!(stats.handled(), 3);
        assert_eq!(stats.failed(), 2);
    }

    #[tokio::test]
    async fn publish_fails_once_receiver_is_gone() {
        let (q, rx) = WorkQueue::bounded(1);
        drop(rx);
        assert!(q.publish(ev(1)).await.is_err());
        assert_eq!(q.pending(), 0);
    }
}
