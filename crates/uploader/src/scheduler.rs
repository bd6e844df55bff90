//! Bounded-concurrency dispatch of chunk uploads.
//!
//! The scheduler owns a counting semaphore: [`admit`](UploadScheduler::admit)
//! waits for a free slot, and the returned [`Admission`] releases it when
//! dropped. Admitted work runs as an independent task tracked in a
//! `JoinSet`, so a job can await, or cancel, everything it dispatched.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::SchedulerError;

/// A held concurrency slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

/// Outcomes collected by [`UploadScheduler::join_all`].
#[derive(Debug)]
pub struct Drained<T> {
    /// Results in completion order.
    pub completed: Vec<T>,
    /// Tasks stopped by cancellation before finishing.
    pub cancelled: usize,
    /// Tasks that panicked.
    pub panicked: usize,
}

/// Limits the number of concurrently running units of work.
pub struct UploadScheduler<T> {
    semaphore: Arc<Semaphore>,
    limit: usize,
    tasks: JoinSet<Option<T>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> UploadScheduler<T> {
    /// Creates a scheduler allowing `limit` concurrent tasks (at least one).
    ///
    /// Cancelling `cancel` stops admissions and in-flight tasks.
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            tasks: JoinSet::new(),
            cancel,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently held, whether or not their task has started.
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Waits for a free slot.
    pub async fn admit(&self) -> Result<Admission, SchedulerError> {
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SchedulerError::Closed),
            permit = self.semaphore.clone().acquire_owned() => permit
                .map(|p| Admission { _permit: p })
                .map_err(|_| SchedulerError::Closed),
        }
    }

    /// Runs `work` as an independent task holding `admission` until it ends.
    pub fn spawn<F>(&mut self, admission: Admission, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let _admission = admission;
            tokio::select! {
                _ = cancel.cancelled() => None,
                out = work => Some(out),
            }
        });
    }

    /// Waits for every spawned task and returns their results.
    pub async fn join_all(&mut self) -> Drained<T> {
        let mut drained = Drained {
            completed: Vec::with_capacity(self.tasks.len()),
            cancelled: 0,
            panicked: 0,
        };
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(Some(out)) => drained.completed.push(out),
                Ok(None) => drained.cancelled += 1,
                Err(e) if e.is_cancelled() => drained.cancelled += 1,
                Err(e) => {
                    warn!(error = %e, "upload task panicked");
                    drained.panicked += 1;
                }
            }
        }
        drained
    }

    /// Stops admissions, cancels in-flight tasks and waits for them to end.
    pub async fn shutdown(&mut self) -> Drained<T> {
        self.cancel.cancel();
        self.semaphore.close();
        self.join_all().await
    }
}
