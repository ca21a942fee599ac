use std::cell::Cell;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

use solar_monitor::Schedulers;

use crate::error::HarnessError;

/// Held for as long as any thread has the scheduler active.
static RULE_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static HOLDING: Cell<bool> = const { Cell::new(false) };
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker threads in the shared pool every lane is collapsed onto.
    pub pool_size: usize,
    /// How long deactivation waits for stragglers before abandoning them.
    pub shutdown_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_size: bounded_pool_size(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// `max(2, min(cpus - 1, 4))`
pub fn bounded_pool_size() -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(2);
    cpus.saturating_sub(1).clamp(2, 4)
}

/// Collapses the io, computation and new-thread lanes onto one bounded pool
/// owned by the test.
pub struct DeterministicScheduler;

impl DeterministicScheduler {
    /// Blocks while another thread holds the scheduler. Activating twice on one
    /// thread is refused instead of deadlocking.
    pub fn activate(config: SchedulerConfig) -> Result<ActiveScheduler, HarnessError> {
        if Self::is_active() {
            return Err(HarnessError::AlreadyActive);
        }

        let lock = RULE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let pool_size = config.pool_size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(pool_size)
            .max_blocking_threads(pool_size)
            .thread_name("harness-lane")
            .enable_all()
            .build()
            .map_err(HarnessError::Runtime)?;

        let handle = runtime.handle().clone();
        HOLDING.with(|holding| holding.set(true));
        info!(pool_size, "deterministic scheduler activated");

        Ok(ActiveScheduler {
            schedulers: Schedulers::single(handle.clone()),
            handle,
            runtime: Some(runtime),
            shutdown_timeout: config.shutdown_timeout,
            _lock: lock,
        })
    }

    /// Whether the calling thread currently holds the scheduler.
    pub fn is_active() -> bool {
        HOLDING.with(Cell::get)
    }
}

/// Scoped activation. Dropping it, on any exit path including a panic,
/// shuts the pool down and releases the scheduler for the next test.
///
/// Must be dropped outside of async code.
pub struct ActiveScheduler {
    schedulers: Schedulers,
    handle: Handle,
    runtime: Option<Runtime>,
    shutdown_timeout: Duration,
    _lock: MutexGuard<'static, ()>,
}

impl ActiveScheduler {
    /// Scheduling context to build the object graph with.
    pub fn schedulers(&self) -> Schedulers {
        self.schedulers.clone()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Drives `future` from the calling (control) thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// Blocks until nothing dispatched through [`Self::schedulers`] is in flight.
    pub fn wait_idle(&self) {
        self.block_on(self.schedulers.wait_idle());
    }

    /// Same as dropping the activation.
    pub fn deactivate(self) {
        drop(self);
    }
}

impl Drop for ActiveScheduler {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(self.shutdown_timeout);
        }
        HOLDING.with(|holding| holding.set(false));
        debug!("deterministic scheduler deactivated");
    }
}
