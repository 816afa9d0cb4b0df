//! Accounting for detached enrichment tasks.
//!
//! The watch loop fires fetch-and-render work and moves straight on to the
//! next mutation batch; nothing in the pipeline ever joins those tasks.
//! [`TaskSet`] keeps an outstanding count so drivers and tests can still
//! await the moment everything in flight has landed.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Spawns detached tasks and counts them until they finish.
///
/// Clones share one counter. Tasks are never cancelled or joined; whatever
/// they do on failure has to happen inside the task body.
#[derive(Clone, Default)]
pub struct TaskSet {
    inner: Arc<TaskSetInner>,
}

#[derive(Default)]
struct TaskSetInner {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` on the runtime. The count drops when the future
    /// finishes, panics included.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = CountGuard(inner);
            future.await;
        });
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Wait until no spawned task is outstanding. Tasks spawned while
    /// waiting are waited for too.
    pub async fn quiesce(&self) {
        loop {
            // Register before checking, so a decrement between the check and
            // the await still wakes this waiter.
            let drained = self.inner.drained.notified();
            if self.outstanding() == 0 {
                return;
            }
            drained.await;
        }
    }
}

struct CountGuard(Arc<TaskSetInner>);

impl Drop for CountGuard {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.drained.notify_waiters();
        }
    }
}
