//! An executor for engine futures built on top of the scheduler.
//!
//! Futures spawned here are not handed to the host runtime directly. Instead
//! every spawn schedules a [`Microtask`], and each microtask run polls the
//! futures that have been woken since the last run. The microtask reports
//! completion once no futures are left, so the executor only occupies the
//! event loop while it has work.
//!
//! Spawned futures land in an intake queue first, so a future may spawn
//! further futures onto its own executor while it is being polled. The intake
//! lock is never held while the running set is locked.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::task::noop_waker;
use semantic_host_handle::Release;

use crate::scheduler::{ScheduledUnit, Scheduler, WorkUnit};

type Running = FuturesUnordered<BoxFuture<'static, ()>>;

#[derive(Default)]
struct Tasks {
    intake: Mutex<Vec<BoxFuture<'static, ()>>>,
    running: Mutex<Running>,
}

impl Tasks {
    fn intake(&self) -> MutexGuard<'_, Vec<BoxFuture<'static, ()>>> {
        self.intake.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn running(&self) -> MutexGuard<'_, Running> {
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An executor whose futures are polled from scheduler ticks.
#[derive(Clone)]
pub struct MicrotaskExecutor {
    scheduler: Scheduler,
    tasks: Arc<Tasks>,
}

impl MicrotaskExecutor {
    /// Create an executor driven by the given scheduler.
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            tasks: Arc::new(Tasks::default()),
        }
    }

    /// Spawn a future and schedule a microtask to drive it.
    pub fn spawn<F>(&self, future: F) -> ScheduledUnit
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.intake().push(Box::pin(future));
        tracing::debug!("scheduling microtask for new task");
        self.scheduler.schedule(Microtask {
            tasks: self.tasks.clone(),
        })
    }

    /// Whether the executor has no futures left to drive.
    ///
    /// Must not be called from a future running on this executor.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Number of futures that have not yet completed.
    ///
    /// Must not be called from a future running on this executor.
    pub fn pending(&self) -> usize {
        let queued = self.tasks.intake().len();
        let running = self.tasks.running().len();
        queued + running
    }
}

impl fmt::Debug for MicrotaskExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Run a future to completion on a fresh executor.
pub fn run<F>(scheduler: &Scheduler, future: F) -> ScheduledUnit
where
    F: Future<Output = ()> + Send + 'static,
{
    MicrotaskExecutor::new(scheduler.clone()).spawn(future)
}

/// One turn of a [`MicrotaskExecutor`].
pub struct Microtask {
    tasks: Arc<Tasks>,
}

impl WorkUnit for Microtask {
    fn run(&mut self) -> bool {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let queued: Vec<_> = self.tasks.intake().drain(..).collect();

        {
            let mut running = self.tasks.running();
            running.extend(queued);
            loop {
                match running.poll_next_unpin(&mut cx) {
                    Poll::Ready(Some(())) => tracing::trace!("task completed"),
                    Poll::Ready(None) => break,
                    Poll::Pending => return false,
                }
            }
        }

        // Futures spawned while polling keep the microtask alive.
        self.tasks.intake().is_empty()
    }
}

impl Release for Microtask {
    fn release(self) {}
}
