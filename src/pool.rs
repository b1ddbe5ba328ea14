use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::error::CollectError;

/// Inclusive bounds on the configured worker count.
pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 32;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cooperative cancellation flag shared between the pool and its tasks.
///
/// Tasks are expected to poll it at natural checkpoints (the page extractor
/// checks once per structural event) and bail out with
/// [`CollectError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shutdown escalation windows, exposed rather than hardcoded: first wait
/// `graceful` for in-flight work to drain, then cancel and wait `forced`.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownConfig {
    pub graceful: Duration,
    pub forced: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful: Duration::from_secs(5),
            forced: Duration::from_secs(2),
        }
    }
}

/// Completion handle for one submitted task.
pub struct TaskHandle<T> {
    result_rx: Receiver<Result<T, CollectError>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task reaches a terminal state. A closed channel means
    /// the owning worker died before delivering a result.
    pub fn join(self) -> Result<T, CollectError> {
        self.result_rx.recv().unwrap_or(Err(CollectError::WorkerLost))
    }
}

/// Fixed-size worker pool over a shared task queue.
///
/// The pool is reused across the parse and formatting phases of a run and is
/// torn down by [`WorkerPool::shutdown`], which must be called exactly once.
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    exited_rx: Receiver<()>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancelToken,
    config: ShutdownConfig,
}

impl WorkerPool {
    pub fn new(threads: usize, config: ShutdownConfig) -> Result<Self, CollectError> {
        if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
            return Err(CollectError::InvalidThreadCount(threads));
        }

        let (job_tx, job_rx) = unbounded::<Job>();
        let (exited_tx, exited_rx) = bounded::<()>(threads);
        let cancel = CancelToken::new();

        let workers = (0..threads)
            .map(|worker_id| {
                let job_rx = job_rx.clone();
                let exited_tx = exited_tx.clone();
                thread::Builder::new()
                    .name(format!("dump-worker-{worker_id}"))
                    .spawn(move || {
                        debug!("worker {worker_id} started");
                        for job in job_rx {
                            job();
                        }
                        debug!("worker {worker_id} exiting");
                        let _ = exited_tx.send(());
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Ok(Self {
            job_tx: Some(job_tx),
            exited_rx,
            workers,
            cancel,
            config,
        })
    }

    /// Token polled by cooperative tasks; set during forced shutdown.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues `task` and returns a handle for its result. Tasks start in
    /// submission order as workers free up.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CollectError> + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        let job: Job = Box::new(move || {
            let _ = result_tx.send(task());
        });
        self.job_tx
            .as_ref()
            .expect("pool already shut down")
            .send(job)
            .expect("worker threads terminated early");
        TaskHandle { result_rx }
    }

    /// Stops accepting work and waits for the workers in two stages: up to
    /// `graceful` for the queue to drain, then (after raising the cancel
    /// flag) up to `forced` for the stragglers. Failing both windows is
    /// fatal for the run.
    pub fn shutdown(mut self) -> Result<(), CollectError> {
        drop(self.job_tx.take());

        let mut remaining = self.workers.len();
        let deadline = Instant::now() + self.config.graceful;
        remaining = self.await_exits(remaining, deadline);

        if remaining > 0 {
            warn!("{remaining} worker(s) still busy after graceful window, cancelling");
            self.cancel.cancel();
            let deadline = Instant::now() + self.config.forced;
            remaining = self.await_exits(remaining, deadline);
        }

        if remaining > 0 {
            return Err(CollectError::ShutdownTimeout(
                self.config.graceful + self.config.forced,
            ));
        }

        // All exit signals received, the joins below cannot block.
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        Ok(())
    }

    fn await_exits(&self, mut remaining: usize, deadline: Instant) -> usize {
        while remaining > 0 {
            match self.exited_rx.recv_deadline(deadline) {
                Ok(()) => remaining -= 1,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        remaining
    }
}
