//! Trailing-edge debouncer
//!
//! Holds at most one pending task. Scheduling a new task cancels the previous
//! one if its delay has not elapsed yet; a task whose delay has elapsed runs
//! to completion.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct Pending {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl Pending {
    /// Abort if still waiting; true if the task will not run
    fn cancel(self) -> bool {
        if self.fired.load(Ordering::Acquire) {
            false
        } else {
            self.handle.abort();
            true
        }
    }

    fn is_waiting(&self) -> bool {
        !self.fired.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

/// Delays a task until `delay` passes without another `schedule` call
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the delay unless superseded first
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::Release);
            task.await;
        });

        let previous = self.pending.lock().replace(Pending { handle, fired });
        if previous.is_some_and(Pending::cancel) {
            tracing::trace!("superseded pending task");
        }
    }

    /// Cancel the pending task; true if one was waiting
    pub fn cancel(&self) -> bool {
        self.pending.lock().take().is_some_and(Pending::cancel)
    }

    /// Is a task waiting for its delay to elapse
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.lock().as_ref().is_some_and(Pending::is_waiting)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_task(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_only_last_task() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let last = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        for i in 1..=5 {
            let runs = Arc::clone(&runs);
            let task = counter_task(&last, i);
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                task.await;
            });
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let value = Arc::new(AtomicUsize::new(0));
        debouncer.schedule(counter_task(&value, 7));

        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(value.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
