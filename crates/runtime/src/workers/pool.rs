//! Bounded pool for blocking client calls.
//!
//! Design principles:
//! - Workers receive two strings and a client handle, nothing else
//! - Completion is observed by polling a oneshot receiver; the simulation
//!   thread never waits
//! - An abandoned call that has not started is skipped when it reaches a
//!   thread, so the client is never invoked for it
//! - An abandoned call that has started cannot be interrupted. It keeps its
//!   thread until the client returns and is counted in
//!   [`QueryMetrics::orphaned`] meanwhile

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info};

use crate::client::LlmClient;
use crate::error::{QueryError, SchedulerError};
use crate::registry::Prompt;
use crate::workers::QueryMetrics;

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
/// Abandoned while running: an orphan.
const ABANDONED: u8 = 2;
/// Abandoned before a thread picked it up.
const CANCELLED: u8 = 3;
const FINISHED: u8 = 4;

/// What a worker sends back.
#[derive(Debug)]
pub(crate) struct Reply {
    pub result: Result<String, QueryError>,
    pub finished_at: Instant,
}

pub(crate) enum Completion {
    Waiting,
    Done(Reply),
    /// The worker ended without replying (the client panicked, or the pool
    /// was shut down before the call started).
    Lost,
}

/// Main-thread handle for one submitted call.
pub(crate) struct Ticket {
    rx: oneshot::Receiver<Reply>,
    state: Arc<AtomicU8>,
    metrics: Arc<QueryMetrics>,
}

impl Ticket {
    pub(crate) fn poll(&mut self) -> Completion {
        match self.rx.try_recv() {
            Ok(reply) => Completion::Done(reply),
            Err(TryRecvError::Empty) => Completion::Waiting,
            Err(TryRecvError::Closed) => Completion::Lost,
        }
    }

    /// Gives up on the call. Returns `true` if it was still executing and is
    /// now counted as an orphan. A queued call is cancelled instead.
    pub(crate) fn abandon(mut self) -> bool {
        self.rx.close();
        if self
            .state
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return false;
        }

        self.metrics.orphan_started();
        let still_running = self
            .state
            .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !still_running {
            self.metrics.orphan_finished();
        }
        still_running
    }
}

/// Moved into the worker closure. Dropped when the call returns, unwinds, is
/// skipped after cancellation, or is discarded unstarted.
struct CallGuard {
    state: Arc<AtomicU8>,
    metrics: Arc<QueryMetrics>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if self.state.swap(FINISHED, Ordering::AcqRel) == ABANDONED {
            self.metrics.orphan_finished();
        }
    }
}

/// Blocking thread pool backed by a dedicated tokio runtime.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    size: usize,
    metrics: Arc<QueryMetrics>,
}

impl WorkerPool {
    pub fn new(size: usize, metrics: Arc<QueryMetrics>) -> Result<Self, SchedulerError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name("strategy-worker")
            .build()
            .map_err(SchedulerError::Pool)?;

        info!(size, "worker pool started");
        Ok(Self {
            runtime: Some(runtime),
            size,
            metrics,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Queues a blocking call. `None` once the pool is shut down.
    pub(crate) fn submit(&self, client: Arc<dyn LlmClient>, prompt: Prompt) -> Option<Ticket> {
        let runtime = self.runtime.as_ref()?;
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(AtomicU8::new(QUEUED));
        let guard = CallGuard {
            state: Arc::clone(&state),
            metrics: Arc::clone(&self.metrics),
        };
        let state_in_worker = Arc::clone(&state);

        runtime.spawn_blocking(move || {
            let _guard = guard;
            if state_in_worker
                .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!("skipping cancelled query");
                return;
            }
            let result = client.query(&prompt.system, &prompt.user);
            // The receiver is gone if the call was abandoned.
            let _ = tx.send(Reply {
                result,
                finished_at: Instant::now(),
            });
        });

        Some(Ticket {
            rx,
            state,
            metrics: Arc::clone(&self.metrics),
        })
    }

    /// Stops accepting work without waiting for running calls. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            info!(orphaned = self.metrics.orphaned(), "worker pool shut down");
        } else {
            debug!("worker pool already shut down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
