//! Threaded ingestion runtime.
//!
//! `ConsensusEngine::ingest` is synchronous. Callers that receive samples
//! from many sources at once can push them through [`IngestRuntime`]
//! instead: a bounded queue feeding a fixed pool of worker threads, each
//! calling into the shared engine. Counter merges commute, so workers may
//! apply samples for the same key in any order.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::engine::{ConsensusEngine, IngestReceipt};
use crate::error::{ExecutionError, TallyError, TallyResult};
use crate::sample::Sample;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued samples.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
        }
    }
}

enum Job {
    Ingest {
        sample: Box<Sample>,
        reply: Sender<TallyResult<IngestReceipt>>,
    },

    #[cfg(test)]
    Hold {
        started: Sender<()>,
        release: Receiver<()>,
    },
}

struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(
        workers: usize,
        queue_capacity: usize,
        engine: &Arc<ConsensusEngine>,
    ) -> TallyResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let engine = Arc::clone(engine);
            let handle = thread::Builder::new()
                .name(format!("kyro-tally-ingest-{idx}"))
                .spawn(move || {
                    debug!(worker = idx, "ingest worker started");
                    while let Ok(job) = rx.recv() {
                        match job {
                            Job::Ingest { sample, reply } => {
                                let _ = reply.send(engine.ingest(&sample));
                            }
                            #[cfg(test)]
                            Job::Hold { started, release } => {
                                let _ = started.send(());
                                let _ = release.recv();
                            }
                        }
                    }
                    debug!(worker = idx, "ingest worker stopped");
                })
                .map_err(|e| TallyError::internal(format!("failed to spawn ingest worker: {e}")))?;
            handles.push(handle);
        }

        Ok(Self {
            tx,
            workers: handles,
            queue_capacity,
        })
    }

    fn try_submit(&self, job: Job) -> Result<(), TallyError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected.into()),
        }
    }

    fn shutdown(self) {
        // Close the channel: workers drain queued jobs then exit.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

/// Handle returned by [`IngestRuntime::submit`].
pub struct IngestHandle {
    rx: Receiver<TallyResult<IngestReceipt>>,
}

impl IngestHandle {
    /// Waits for the sample to be merged.
    ///
    /// # Errors
    ///
    /// Returns the ingestion error, or `Disconnected` if the worker died.
    pub fn join(self) -> TallyResult<IngestReceipt> {
        self.rx
            .recv()
            .map_err(|_| TallyError::from(ExecutionError::Disconnected))?
    }

    /// Waits for the sample to be merged, giving up after `timeout`.
    ///
    /// A timeout does not cancel the job; it may still be applied.
    ///
    /// # Errors
    ///
    /// Returns `Timeout`, `Disconnected`, or the ingestion error.
    pub fn join_timeout(self, timeout: Duration) -> TallyResult<IngestReceipt> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TallyError::from(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => TallyError::from(ExecutionError::Disconnected),
        })?
    }
}

/// Bounded worker pool running ingestion against a shared engine.
pub struct IngestRuntime {
    engine: Arc<ConsensusEngine>,
    pool: Option<WorkerPool>,
}

impl IngestRuntime {
    /// Start the worker pool.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a worker thread cannot be spawned.
    pub fn new(engine: ConsensusEngine, config: &RuntimeConfig) -> TallyResult<Self> {
        let engine = Arc::new(engine);
        let pool = WorkerPool::start(config.workers, config.queue_capacity, &engine)?;
        Ok(Self {
            engine,
            pool: Some(pool),
        })
    }

    fn pool(&self) -> TallyResult<&WorkerPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| ExecutionError::Disconnected.into())
    }

    /// Queue a sample without waiting for it to merge.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` when the queue is at capacity.
    pub fn submit(&self, sample: Sample) -> TallyResult<IngestHandle> {
        let (tx, rx) = bounded::<TallyResult<IngestReceipt>>(1);
        self.pool()?.try_submit(Job::Ingest {
            sample: Box::new(sample),
            reply: tx,
        })?;
        Ok(IngestHandle { rx })
    }

    /// Queue a sample and wait for it to merge.
    ///
    /// # Errors
    ///
    /// See [`IngestRuntime::submit`] and [`IngestHandle::join`].
    pub fn ingest(&self, sample: Sample) -> TallyResult<IngestReceipt> {
        self.submit(sample)?.join()
    }

    /// Returns a shared reference to the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    /// Parks one worker until the returned sender is used or dropped.
    #[cfg(test)]
    fn submit_hold(&self) -> TallyResult<(Receiver<()>, Sender<()>)> {
        let (started_tx, started_rx) = bounded::<()>(1);
        let (release_tx, release_rx) = bounded::<()>(1);
        self.pool()?.try_submit(Job::Hold {
            started: started_tx,
            release: release_rx,
        })?;
        Ok((started_rx, release_tx))
    }
}

impl Drop for IngestRuntime {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}
