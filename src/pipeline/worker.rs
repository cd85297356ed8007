//! Bounded synthesis workers, one per engine family.
//!
//! Each worker thread owns its [`Synthesizer`] (and so its model session)
//! outright, so at most one inference runs per session at a time. Jobs
//! arrive on a bounded channel; a full queue surfaces as `Busy` rather than
//! blocking the submitter. Workers for different families run concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use super::{SynthesisRequest, SynthesisResult, Synthesizer};
use crate::error::SynthesisError;
use crate::voice::EngineFamily;

/// Cooperative cancellation flag, checked between chunks. An in-flight
/// model invocation is never interrupted.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

struct Job {
    request: SynthesisRequest,
    cancel: CancelToken,
    reply: Sender<Result<SynthesisResult, SynthesisError>>,
}

/// Handle to a pending job; the result arrives through a bounded(1)
/// channel acting as the promise.
#[derive(Debug)]
pub struct JobTicket {
    rx: Receiver<Result<SynthesisResult, SynthesisError>>,
}

impl JobTicket {
    /// Block until the worker delivers the result.
    pub fn wait(self) -> Result<SynthesisResult, SynthesisError> {
        self.rx.recv().map_err(|_| SynthesisError::WorkerGone)?
    }

    /// Non-blocking poll; `None` while the job is still running.
    pub fn try_take(&self) -> Option<Result<SynthesisResult, SynthesisError>> {
        self.rx.try_recv().ok()
    }
}

struct WorkerHandle {
    tx: Sender<Job>,
    thread: JoinHandle<()>,
}

/// One worker thread per registered engine family.
#[derive(Default)]
pub struct WorkerPool {
    workers: HashMap<EngineFamily, WorkerHandle>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a worker owning `synthesizer`, with a job queue of
    /// `queue_depth` pending requests.
    pub fn spawn(
        &mut self,
        family: EngineFamily,
        mut synthesizer: Synthesizer,
        queue_depth: usize,
    ) {
        let (tx, rx) = bounded::<Job>(queue_depth.max(1));
        let thread = std::thread::spawn(move || {
            log::info!("Synthesis worker for {family:?} started");
            while let Ok(job) = rx.recv() {
                if job.cancel.is_cancelled() {
                    let _ = job.reply.send(Err(SynthesisError::Cancelled));
                    continue;
                }
                let result = synthesizer.synthesize_cancellable(&job.request, &job.cancel);
                // A dropped ticket just discards the result.
                let _ = job.reply.send(result);
            }
            log::info!("Synthesis worker for {family:?} stopped");
        });
        if self
            .workers
            .insert(family, WorkerHandle { tx, thread })
            .is_some()
        {
            log::warn!("Replacing existing worker for {family:?}");
        }
    }

    /// Enqueue a request for its family's worker without blocking.
    ///
    /// A full queue returns `Busy`; a stopped worker returns `WorkerGone`.
    pub fn try_submit(
        &self,
        family: EngineFamily,
        request: SynthesisRequest,
        cancel: CancelToken,
    ) -> Result<JobTicket, SynthesisError> {
        let worker = self
            .workers
            .get(&family)
            .ok_or(SynthesisError::WorkerGone)?;
        let (reply, rx) = bounded(1);
        let job = Job {
            request,
            cancel,
            reply,
        };
        match worker.tx.try_send(job) {
            Ok(()) => Ok(JobTicket { rx }),
            Err(TrySendError::Full(_)) => Err(SynthesisError::Busy),
            Err(TrySendError::Disconnected(_)) => Err(SynthesisError::WorkerGone),
        }
    }

    pub fn has_worker(&self, family: EngineFamily) -> bool {
        self.workers.contains_key(&family)
    }

    /// Close all queues and join the worker threads.
    pub fn shutdown(&mut self) {
        for (family, handle) in self.workers.drain() {
            drop(handle.tx);
            if handle.thread.join().is_err() {
                log::error!("Worker for {family:?} panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
