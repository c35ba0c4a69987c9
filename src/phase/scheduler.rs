//! Scheduling port for deferred transitions
//!
//! The controller hands the second half of each lamp sequence to a
//! [`Scheduler`]. Every scheduled task is one-shot and is never cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::trace;

/// A callback to run once after a delay.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay, without blocking the caller.
pub trait Scheduler: Send + Sync {
    /// Arranges for `task` to run once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask;
}

/// Receipt for a task accepted by a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    id: u64,
}

impl ScheduledTask {
    /// Builds a receipt for the task numbered `id`.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self { id }
    }

    /// Scheduler-assigned identifier, unique per scheduler.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Scheduler backed by the ambient tokio runtime: each task is a spawned
/// future that sleeps out its delay and then runs the callback.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }
}

impl Scheduler for TokioScheduler {
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        // Created here so the deadline counts from the call, not from the
        // first poll. Delays past the clock's range are capped by tokio.
        let sleep = tokio::time::sleep(delay);
        tokio::spawn(async move {
            sleep.await;
            trace!(id, "scheduled task due");
            task();
        });
        ScheduledTask::new(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;

    async fn advance(by: Duration) {
        tokio::time::advance(by).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn flag_task(flag: &Arc<AtomicBool>) -> Task {
        let flag = Arc::clone(flag);
        Box::new(move || flag.store(true, Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        let scheduler = TokioScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        scheduler.schedule(Duration::from_millis(2000), flag_task(&fired));

        advance(Duration::from_millis(1999)).await;
        assert!(!fired.load(Ordering::SeqCst));

        advance(Duration::from_millis(1)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ids_are_sequential() {
        let scheduler = TokioScheduler::new();

        let a = scheduler.schedule(Duration::from_secs(3), Box::new(|| {}));
        let b = scheduler.schedule(Duration::from_secs(2), Box::new(|| {}));

        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(ScheduledTask::new(7).id(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_beyond_clock_range_does_not_panic() {
        let scheduler = TokioScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));

        scheduler.schedule(Duration::MAX, flag_task(&fired));

        advance(Duration::from_secs(86_400 * 365)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
