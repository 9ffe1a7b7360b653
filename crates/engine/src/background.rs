//! Per-collection persistence queue.
//!
//! A single worker thread executing tasks strictly in submission order.
//! Each collection owns one, so saves for the same collection never run
//! concurrently and a later save always starts after an earlier one finished.

use parking_lot::{Condvar, Mutex as ParkingMutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::error;

/// Error returned when submitting to a queue that has been shut down.
#[derive(Debug)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "persistence queue is shut down")
    }
}

impl std::error::Error for QueueClosed {}

/// Queue metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently executing (0 or 1).
    pub active_tasks: usize,
    /// Total number of tasks completed since creation.
    pub tasks_completed: u64,
}

type Task = Box<dyn FnOnce() + Send>;

struct QueueInner {
    queue: ParkingMutex<VecDeque<Task>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    tasks_completed: AtomicU64,
}

/// Single-worker FIFO task queue.
pub struct SaveQueue {
    inner: Arc<QueueInner>,
    worker: ParkingMutex<Option<JoinHandle<()>>>,
}

impl SaveQueue {
    /// Create a queue and start its worker.
    ///
    /// The worker is named `stash-save-<label>`.
    pub fn new(label: &str) -> Self {
        let inner = Arc::new(QueueInner {
            queue: ParkingMutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            tasks_completed: AtomicU64::new(0),
        });

        let inner_clone = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name(format!("stash-save-{}", label))
            .spawn(move || worker_loop(&inner_clone))
            .expect("failed to spawn persistence worker thread");

        Self {
            inner,
            worker: ParkingMutex::new(Some(handle)),
        }
    }

    /// Append a task to the queue.
    ///
    /// Returns `Err(QueueClosed)` once the queue has been shut down.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> Result<(), QueueClosed> {
        {
            let mut queue = self.inner.queue.lock();
            // Checked under the lock so a task cannot slip in after the
            // worker has seen shutdown and exited.
            if self.inner.shutdown.load(AtomicOrdering::Acquire) {
                return Err(QueueClosed);
            }
            queue.push_back(Box::new(work));
            self.inner.queue_depth.fetch_add(1, AtomicOrdering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// The worker keeps running afterwards.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(AtomicOrdering::Acquire) > 0
            || self.inner.active_tasks.load(AtomicOrdering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Stop accepting tasks, run what is already queued, and join the worker.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        {
            let _queue = self.inner.queue.lock();
            self.inner.shutdown.store(true, AtomicOrdering::Release);
            self.inner.work_ready.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    /// Return a snapshot of queue metrics.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queue_depth: self.inner.queue_depth.load(AtomicOrdering::Relaxed),
            active_tasks: self.inner.active_tasks.load(AtomicOrdering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(AtomicOrdering::Relaxed),
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// RAII guard that decrements `active_tasks` and notifies drain waiters on drop.
///
/// Keeps the bookkeeping right even if a task panics; otherwise `drain()`
/// would wait forever.
struct ActiveTaskGuard<'a> {
    inner: &'a QueueInner,
}

impl<'a> Drop for ActiveTaskGuard<'a> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, AtomicOrdering::Release);
        self.inner
            .tasks_completed
            .fetch_add(1, AtomicOrdering::Relaxed);

        // Lock before notifying: drain() checks the condition and waits while
        // holding this lock, so the notify cannot be lost.
        if prev_active == 1 && self.inner.queue_depth.load(AtomicOrdering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &QueueInner) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    // Mark active before the depth drops so drain() never
                    // sees an idle queue while a task is being handed over.
                    inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
                    inner.queue_depth.fetch_sub(1, AtomicOrdering::Release);
                    break task;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };

        // A panicking task must not kill the only worker.
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            error!(
                target: "stash::persist",
                "persistence task panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
