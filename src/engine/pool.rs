// src/engine/pool.rs

//! Worker pool that runs step bodies.
//!
//! Step bodies are synchronous and may block for I/O, so they run on the
//! blocking pool of a dedicated multi-threaded Tokio runtime. That pool
//! starts empty, grows on demand up to `max_threads`, and retires threads
//! that stay idle longer than `keep_alive_ms`. The runtime's async workers
//! (`core_threads`) never run step bodies.

use std::fmt;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

use crate::config::WorkerPoolConfig;
use crate::errors::Result;

pub struct WorkerPool {
    runtime: Runtime,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool").finish_non_exhaustive()
    }
}

impl WorkerPool {
    pub fn new(cfg: &WorkerPoolConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(cfg.core_threads)
            .max_blocking_threads(cfg.max_threads)
            .thread_keep_alive(Duration::from_millis(cfg.keep_alive_ms))
            .thread_name(cfg.thread_name.clone())
            .build()?;

        debug!(
            core_threads = cfg.core_threads,
            max_threads = cfg.max_threads,
            "worker pool started"
        );

        Ok(Self { runtime })
    }

    /// Handle used by workers to submit follow-up steps.
    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Stop accepting work and wait for every running step to return.
    ///
    /// Dropping the runtime blocks until all blocking-pool threads have
    /// finished their current task. Must not be called from inside an async
    /// context.
    pub fn shutdown(self) {
        drop(self.runtime);
        debug!("worker pool stopped");
    }
}
