use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::runtime::{Builder, Handle};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Categories of background work the application dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Network and storage round trips.
    Io,
    /// CPU-bound mapping of fetched data into view state.
    Computation,
    /// Long-lived listeners that get a thread of their own, such as a radio scan.
    NewThread,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Io, Lane::Computation, Lane::NewThread];
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lane::Io => "io",
            Lane::Computation => "computation",
            Lane::NewThread => "new-thread",
        };
        f.write_str(name)
    }
}

/// Where a lane's work ends up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneKind {
    Runtime,
    BlockingPool,
    DedicatedThread,
}

#[derive(Debug, Clone)]
enum LaneExecutor {
    Runtime(Handle),
    BlockingPool(Handle),
    DedicatedThread,
}

impl LaneExecutor {
    fn kind(&self) -> LaneKind {
        match self {
            LaneExecutor::Runtime(_) => LaneKind::Runtime,
            LaneExecutor::BlockingPool(_) => LaneKind::BlockingPool,
            LaneExecutor::DedicatedThread => LaneKind::DedicatedThread,
        }
    }
}

#[derive(Debug, Default)]
struct PendingWork {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the dispatched work finishes, panics
/// or is dropped unrun.
struct InFlight(Arc<PendingWork>);

impl InFlight {
    fn enter(pending: Arc<PendingWork>) -> Self {
        pending.count.fetch_add(1, Ordering::AcqRel);
        Self(pending)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Scheduling context handed to the object graph. Every background dispatch
/// the application makes goes through one of its lanes.
#[derive(Debug, Clone)]
pub struct Schedulers {
    io: LaneExecutor,
    computation: LaneExecutor,
    new_thread: LaneExecutor,
    pending: Arc<PendingWork>,
}

impl Schedulers {
    /// Io on the runtime, computation on its blocking pool, new-thread work on
    /// a fresh OS thread per dispatch.
    pub fn production(handle: Handle) -> Self {
        Self {
            io: LaneExecutor::Runtime(handle.clone()),
            computation: LaneExecutor::BlockingPool(handle),
            new_thread: LaneExecutor::DedicatedThread,
            pending: Arc::default(),
        }
    }

    /// Every lane runs on `handle`.
    pub fn single(handle: Handle) -> Self {
        Self {
            io: LaneExecutor::Runtime(handle.clone()),
            computation: LaneExecutor::Runtime(handle.clone()),
            new_thread: LaneExecutor::Runtime(handle),
            pending: Arc::default(),
        }
    }

    pub fn lane_kind(&self, lane: Lane) -> LaneKind {
        self.executor(lane).kind()
    }

    /// Number of dispatched units of work that have not finished yet.
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::Acquire)
    }

    pub fn spawn<F>(&self, lane: Lane, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = InFlight::enter(self.pending.clone());
        let work = async move {
            let _guard = guard;
            work.await;
        };

        debug!(%lane, "dispatching work");
        match self.executor(lane) {
            LaneExecutor::Runtime(handle) => {
                handle.spawn(work);
            }
            LaneExecutor::BlockingPool(handle) => {
                let runner = handle.clone();
                handle.spawn_blocking(move || runner.block_on(work));
            }
            LaneExecutor::DedicatedThread => {
                let spawned = thread::Builder::new()
                    .name(format!("solar-monitor-{lane}"))
                    .spawn(move || match Builder::new_current_thread().enable_all().build() {
                        Ok(runtime) => runtime.block_on(work),
                        Err(err) => warn!(%lane, error = %err, "lane runtime build failed"),
                    });
                if let Err(err) = spawned {
                    warn!(%lane, error = %err, "lane thread spawn failed");
                }
            }
        }
    }

    /// Resolves once nothing dispatched through these schedulers is in flight,
    /// including work spawned by other dispatched work before it finished.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.pending.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn executor(&self, lane: Lane) -> &LaneExecutor {
        match lane {
            Lane::Io => &self.io,
            Lane::Computation => &self.computation,
            Lane::NewThread => &self.new_thread,
        }
    }
}
