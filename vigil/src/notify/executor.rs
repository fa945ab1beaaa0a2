//! Affinity executors.
//!
//! Observers (typically a UI binding layer) own state that must only be
//! touched from one execution context. An [`AffinityExecutor`] runs a job
//! inline when the caller is already on that context and otherwise queues it
//! for the context's owner to run.

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;

/// A unit of work delivered on the affinity context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run callbacks on the observers' execution context.
pub trait AffinityExecutor: Send + Sync {
    /// Returns `true` if the calling thread is the affinity context.
    fn is_on_affinity_context(&self) -> bool;

    /// Queue `job` to run on the affinity context.
    fn schedule(&self, job: Job);

    /// Run `job` now if already on the affinity context, otherwise queue it.
    fn run_or_schedule(&self, job: Job) {
        if self.is_on_affinity_context() {
            job();
        } else {
            self.schedule(job);
        }
    }
}

/// Executor for headless use: every context counts as the affinity context.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl AffinityExecutor for InlineExecutor {
    fn is_on_affinity_context(&self) -> bool {
        true
    }

    fn schedule(&self, job: Job) {
        job();
    }
}

/// Sender half of a channel-backed affinity context.
///
/// Jobs scheduled from other threads are queued until the owning loop
/// drains its [`AffinityQueue`].
#[derive(Clone, Debug)]
pub struct ChannelExecutor {
    tx: mpsc::UnboundedSender<Job>,
    owner: Arc<Mutex<ThreadId>>,
}

impl AffinityExecutor for ChannelExecutor {
    fn is_on_affinity_context(&self) -> bool {
        self.owner
            .lock()
            .map(|owner| *owner == thread::current().id())
            .unwrap_or(false)
    }

    /// Non-blocking. A closed queue means the owner is shutting down; the
    /// job is dropped.
    fn schedule(&self, job: Job) {
        if self.tx.send(job).is_err() {
            log::debug!("Affinity queue closed, dropping job");
        }
    }
}

/// Receiver half of a channel-backed affinity context.
pub struct AffinityQueue {
    rx: mpsc::UnboundedReceiver<Job>,
    owner: Arc<Mutex<ThreadId>>,
}

impl AffinityQueue {
    /// Make the calling thread the affinity context.
    pub fn bind_current_thread(&self) {
        if let Ok(mut owner) = self.owner.lock() {
            *owner = thread::current().id();
        }
    }

    /// Wait for the next job and run it.
    ///
    /// Returns `false` once every executor has been dropped.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run every job already queued, returning how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs until every executor has been dropped.
    pub async fn run(mut self) {
        while self.run_next().await {}
    }
}

/// Create an executor/queue pair bound to the calling thread.
pub fn channel() -> (ChannelExecutor, AffinityQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let owner = Arc::new(Mutex::new(thread::current().id()));
    (
        ChannelExecutor {
            tx,
            owner: Arc::clone(&owner),
        },
        AffinityQueue { rx, owner },
    )
}
