//! Background consumer of practice outcomes.
//!
//! Outcomes are queued on a bounded tokio mpsc channel and applied one at a
//! time, which keeps each (student, topic) row single-writer. Cancelling the
//! shutdown token stops intake and drains what is already queued.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::scheduler::{PracticeOutcome, PracticeScheduler};

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub applied: u64,
    pub failed: u64,
}

/// Handle for queueing outcomes.
#[derive(Debug, Clone)]
pub struct OutcomeSender {
    tx: mpsc::Sender<PracticeOutcome>,
}

impl OutcomeSender {
    /// Queue an outcome, waiting for capacity.
    pub async fn submit(&self, outcome: PracticeOutcome) -> Result<(), SchedulerError> {
        self.tx
            .send(outcome)
            .await
            .map_err(|_| SchedulerError::NotRunning)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct OutcomeWorker {
    scheduler: Arc<PracticeScheduler>,
    rx: mpsc::Receiver<PracticeOutcome>,
    shutdown: CancellationToken,
    stats: WorkerStats,
}

impl OutcomeWorker {
    /// Create a worker and its sender. Capacity comes from the scheduler's
    /// settings.
    pub fn new(scheduler: Arc<PracticeScheduler>, shutdown: CancellationToken) -> (Self, OutcomeSender) {
        let capacity = scheduler.settings().queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let worker = Self {
            scheduler,
            rx,
            shutdown,
            stats: WorkerStats::default(),
        };
        (worker, OutcomeSender { tx })
    }

    /// Create a worker and run it on the current runtime.
    pub fn spawn(
        scheduler: Arc<PracticeScheduler>,
        shutdown: CancellationToken,
    ) -> (OutcomeSender, JoinHandle<WorkerStats>) {
        let (worker, sender) = Self::new(scheduler, shutdown);
        (sender, tokio::spawn(worker.run()))
    }

    /// Apply outcomes until cancelled or every sender is dropped.
    pub async fn run(mut self) -> WorkerStats {
        info!("Outcome worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Outcome worker received shutdown signal");
                    break;
                }
                next = self.rx.recv() => match next {
                    Some(outcome) => self.apply(outcome).await,
                    None => break,
                },
            }
        }

        // Stop intake, then drain what is already queued
        self.rx.close();
        while let Some(outcome) = self.rx.recv().await {
            self.apply(outcome).await;
        }

        info!(
            applied = self.stats.applied,
            failed = self.stats.failed,
            "Outcome worker stopped"
        );
        self.stats
    }

    async fn apply(&mut self, outcome: PracticeOutcome) {
        match self.scheduler.record_outcome(&outcome).await {
            Ok(_) => self.stats.applied += 1,
            Err(e) => {
                warn!(
                    student = %outcome.student_id,
                    topic = %outcome.topic_id,
                    error = %e,
                    "Failed to apply practice outcome"
                );
                self.stats.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryPracticeStore, PracticeStore};
    use tutor_types::SchedulerSettings;

    fn scheduler(store: Arc<InMemoryPracticeStore>) -> Arc<PracticeScheduler> {
        Arc::new(PracticeScheduler::new(store))
    }

    #[tokio::test]
    async fn test_applies_outcomes_until_senders_drop() {
        let store = Arc::new(InMemoryPracticeStore::new());
        let (sender, handle) = OutcomeWorker::spawn(scheduler(store.clone()), CancellationToken::new());

        for correct in [true, false, true] {
            sender
                .submit(PracticeOutcome::new("s1", "ratio", correct))
                .await
                .unwrap();
        }
        drop(sender);

        let stats = handle.await.unwrap();
        assert_eq!(stats, WorkerStats { applied: 3, failed: 0 });

        let perf = store.get_performance("s1", "ratio").await.unwrap().unwrap();
        assert_eq!(perf.attempted, 3);
        assert_eq!(perf.correct, 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let store = Arc::new(InMemoryPracticeStore::new());
        let token = CancellationToken::new();
        let (worker, sender) = OutcomeWorker::new(scheduler(store.clone()), token.clone());

        // Queue before the worker starts so cancellation races a full buffer
        for _ in 0..5 {
            sender
                .submit(PracticeOutcome::new("s1", "fractions", true))
                .await
                .unwrap();
        }
        token.cancel();

        let stats = worker.run().await;
        assert_eq!(stats.applied, 5);
        assert!(sender.is_closed());
        assert!(matches!(
            sender.submit(PracticeOutcome::new("s1", "fractions", true)).await,
            Err(SchedulerError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_invalid_outcomes_are_counted() {
        let store = Arc::new(InMemoryPracticeStore::new());
        let (sender, handle) = OutcomeWorker::spawn(scheduler(store), CancellationToken::new());

        sender
            .submit(PracticeOutcome::new("s1", "ratio", true).with_quality(8))
            .await
            .unwrap();
        sender.submit(PracticeOutcome::new("s1", "ratio", true)).await.unwrap();
        drop(sender);

        assert_eq!(handle.await.unwrap(), WorkerStats { applied: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_capacity_from_settings() {
        let store = Arc::new(InMemoryPracticeStore::new());
        let s = PracticeScheduler::new(store).with_settings(SchedulerSettings {
            queue_capacity: 2,
            ..Default::default()
        });
        let (_worker, sender) = OutcomeWorker::new(Arc::new(s), CancellationToken::new());

        assert!(sender.tx.try_send(PracticeOutcome::new("s1", "ratio", true)).is_ok());
        assert!(sender.tx.try_send(PracticeOutcome::new("s1", "ratio", true)).is_ok());
        assert!(sender.tx.try_send(PracticeOutcome::new("s1", "ratio", true)).is_err());
    }
}
