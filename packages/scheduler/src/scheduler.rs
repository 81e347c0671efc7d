//! Tick-driven execution of engine work units.
//!
//! Each scheduled unit gets its own task on the host runtime. The task yields
//! to the event loop before every invocation, so a unit is never run
//! synchronously from `schedule` and never monopolizes the loop:
//!
//! ```text
//! schedule(unit) ─► [yield] ─► run() ─► false ─► [yield] ─► run() ─► true ─► release
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use semantic_host_handle::{HandleId, Owned, Release};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};

/// A single schedulable action issued by the engine.
pub trait WorkUnit: Release {
    /// Perform one slice of work. Returns `true` once the unit is complete.
    fn run(&mut self) -> bool;
}

/// Drives work units to completion on the host event loop.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    runtime: Handle,
}

impl Scheduler {
    /// Create a scheduler bound to the runtime of the calling context.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;
        Ok(Self::with_runtime(config, runtime))
    }

    /// Create a scheduler bound to an explicit runtime.
    pub fn with_runtime(config: SchedulerConfig, runtime: Handle) -> Self {
        Self { config, runtime }
    }

    /// The scheduler's configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The runtime work units are driven on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Queue a work unit for execution on a later tick.
    ///
    /// The unit is invoked once per tick until it reports completion, then
    /// released. There is no bound on the number of ticks.
    pub fn schedule<U>(&self, unit: U) -> ScheduledUnit
    where
        U: WorkUnit + Send + 'static,
    {
        let handle = Owned::new(unit);
        let id = handle.id();
        tracing::debug!(unit = %id, "scheduling work unit");
        let task = self.runtime.spawn(drive(handle, self.config.tick_delay));
        ScheduledUnit { id, task }
    }

    /// Queue a work unit that cannot leave the current thread.
    ///
    /// Must be called from within a [`tokio::task::LocalSet`].
    pub fn schedule_local<U>(&self, unit: U) -> ScheduledUnit
    where
        U: WorkUnit + 'static,
    {
        let handle = Owned::new(unit);
        let id = handle.id();
        tracing::debug!(unit = %id, "scheduling local work unit");
        let task = tokio::task::spawn_local(drive(handle, self.config.tick_delay));
        ScheduledUnit { id, task }
    }
}

/// A work unit that has been handed to the scheduler.
///
/// Dropping this does not cancel the unit; it keeps running until it completes.
#[derive(Debug)]
pub struct ScheduledUnit {
    id: HandleId,
    task: JoinHandle<Result<usize>>,
}

impl ScheduledUnit {
    /// The handle identity of the scheduled unit.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Whether the unit has reached a terminal outcome.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the unit to complete. Returns the number of invocations it took.
    pub async fn wait(self) -> Result<usize> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(SchedulerError::Interrupted {
                id: self.id,
                message: e.to_string(),
            }),
        }
    }
}

async fn drive<U: WorkUnit>(mut handle: Owned<U>, delay: Duration) -> Result<usize> {
    let id = handle.id();
    let mut invocations = 0usize;

    loop {
        tick(delay).await;
        invocations += 1;

        match panic::catch_unwind(AssertUnwindSafe(|| handle.get_mut().run())) {
            Ok(true) => {
                tracing::debug!(unit = %id, invocations, "work unit completed");
                handle.release();
                return Ok(invocations);
            }
            Ok(false) => {
                tracing::trace!(unit = %id, invocations, "work unit not ready");
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(unit = %id, invocations, %message, "work unit panicked");
                handle.leak();
                return Err(SchedulerError::WorkUnitPanicked { id, message });
            }
        }
    }
}

async fn tick(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic_host_handle::testing::{ReleaseCounter, ReleaseProbe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Completes on its `completes_on`-th invocation; `0` means never.
    struct CountingUnit {
        completes_on: usize,
        invocations: Arc<AtomicUsize>,
        invocations_at_release: Arc<AtomicUsize>,
        probe: ReleaseProbe,
    }

    struct Observed {
        invocations: Arc<AtomicUsize>,
        invocations_at_release: Arc<AtomicUsize>,
        released: ReleaseCounter,
    }

    fn counting_unit(completes_on: usize) -> (CountingUnit, Observed) {
        let (probe, released) = ReleaseProbe::new();
        let invocations = Arc::new(AtomicUsize::new(0));
        let invocations_at_release = Arc::new(AtomicUsize::new(usize::MAX));
        let unit = CountingUnit {
            completes_on,
            invocations: invocations.clone(),
            invocations_at_release: invocations_at_release.clone(),
            probe,
        };
        let observed = Observed {
            invocations,
            invocations_at_release,
            released,
        };
        (unit, observed)
    }

    impl WorkUnit for CountingUnit {
        fn run(&mut self) -> bool {
            let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            n == self.completes_on
        }
    }

    impl Release for CountingUnit {
        fn release(self) {
            self.invocations_at_release
                .store(self.invocations.load(Ordering::SeqCst), Ordering::SeqCst);
            self.probe.release();
        }
    }

    struct PanickingUnit {
        probe: ReleaseProbe,
    }

    impl WorkUnit for PanickingUnit {
        fn run(&mut self) -> bool {
            panic!("engine trapped");
        }
    }

    impl Release for PanickingUnit {
        fn release(self) {
            self.probe.release();
        }
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(SchedulerConfig::default()).unwrap()
    }

    #[test]
    fn new_without_runtime_fails() {
        let result = Scheduler::new(SchedulerConfig::default());
        assert!(matches!(result, Err(SchedulerError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn unit_completing_on_nth_run_is_invoked_n_times() {
        let (unit, observed) = counting_unit(5);
        let invocations = scheduler().schedule(unit).wait().await.unwrap();

        assert_eq!(invocations, 5);
        assert_eq!(observed.invocations.load(Ordering::SeqCst), 5);
        assert_eq!(observed.released.released(), 1);
        assert_eq!(observed.invocations_at_release.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn unit_completing_immediately_runs_once() {
        let (unit, observed) = counting_unit(1);
        assert_eq!(scheduler().schedule(unit).wait().await.unwrap(), 1);
        assert_eq!(observed.released.released(), 1);
    }

    #[tokio::test]
    async fn schedule_does_not_run_synchronously() {
        let (unit, observed) = counting_unit(1);
        let scheduled = scheduler().schedule(unit);

        assert_eq!(observed.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(observed.released.released(), 0);

        scheduled.wait().await.unwrap();
        assert_eq!(observed.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unit_is_not_released_before_completion() {
        let (unit, observed) = counting_unit(0);
        let scheduled = scheduler().schedule(unit);

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert!(observed.invocations.load(Ordering::SeqCst) > 1);
        assert_eq!(observed.released.released(), 0);
        assert!(!scheduled.is_finished());
    }

    #[tokio::test]
    async fn independent_units_interleave() {
        let scheduler = scheduler();
        let (slow, slow_observed) = counting_unit(10);
        let (fast, fast_observed) = counting_unit(2);

        let slow = scheduler.schedule(slow);
        let fast = scheduler.schedule(fast);

        assert_eq!(fast.wait().await.unwrap(), 2);
        assert!(slow_observed.invocations.load(Ordering::SeqCst) < 10);
        assert_eq!(slow.wait().await.unwrap(), 10);

        assert_eq!(slow_observed.released.released(), 1);
        assert_eq!(fast_observed.released.released(), 1);
    }

    #[tokio::test]
    async fn panicking_unit_is_leaked_and_reported() {
        let (probe, released) = ReleaseProbe::new();
        let scheduled = scheduler().schedule(PanickingUnit { probe });
        let id = scheduled.id();

        match scheduled.wait().await {
            Err(SchedulerError::WorkUnitPanicked { id: failed, message }) => {
                assert_eq!(failed, id);
                assert_eq!(message, "engine trapped");
            }
            other => panic!("expected panic report, got {:?}", other),
        }
        assert_eq!(released.released(), 0);
    }

    #[tokio::test]
    async fn positive_tick_delay_is_honored() {
        let config = SchedulerConfig {
            tick_delay: Duration::from_millis(5),
        };
        let scheduler = Scheduler::new(config).unwrap();
        let (unit, observed) = counting_unit(3);

        let started = tokio::time::Instant::now();
        assert_eq!(scheduler.schedule(unit).wait().await.unwrap(), 3);
        assert!(started.elapsed() >= Duration::from_millis(15));
        assert_eq!(observed.released.released(), 1);
    }

    #[tokio::test]
    async fn local_units_run_inside_local_set() {
        struct LocalUnit {
            runs: std::rc::Rc<std::cell::Cell<usize>>,
        }
        impl WorkUnit for LocalUnit {
            fn run(&mut self) -> bool {
                self.runs.set(self.runs.get() + 1);
                self.runs.get() == 3
            }
        }
        impl Release for LocalUnit {
            fn release(self) {}
        }

        let runs = std::rc::Rc::new(std::cell::Cell::new(0));
        let unit = LocalUnit { runs: runs.clone() };
        let scheduler = scheduler();

        let local = tokio::task::LocalSet::new();
        let invocations = local
            .run_until(async move { scheduler.schedule_local(unit).wait().await })
            .await
            .unwrap();

        assert_eq!(invocations, 3);
        assert_eq!(runs.get(), 3);
    }
}
