use std::future::Future as StdFuture;
use std::io;

use tokio::runtime::{Builder, Runtime};
use tokio::task::{JoinHandle, LocalSet};

/// Single-threaded cooperative host for lightweight threads.
///
/// Everything spawned here runs on the calling thread. A task suspended in
/// `read().await` yields to the others until its future settles.
pub struct EventLoop {
    runtime: Runtime,
    local: LocalSet,
}

impl EventLoop {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            local: LocalSet::new(),
        })
    }

    /// Start a lightweight thread. It begins running once the loop is
    /// driven by [`block_on`](Self::block_on) or [`run`](Self::run).
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: StdFuture + 'static,
        F::Output: 'static,
    {
        self.local.spawn_local(task)
    }

    /// Drive the loop until `task` completes. Other lightweight threads make
    /// progress in the meantime.
    pub fn block_on<F: StdFuture>(&self, task: F) -> F::Output {
        self.local.block_on(&self.runtime, task)
    }

    /// Drive the loop until every spawned lightweight thread has finished.
    pub fn run(self) {
        let Self { runtime, local } = self;
        runtime.block_on(local);
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop").finish_non_exhaustive()
    }
}
