//! Cancellable, re-armable delay timer.
//!
//! One timer thread per collection. `arm()` (re)sets the deadline to
//! `now + delay`; when a deadline passes without being moved or cleared the
//! callback runs once. Bursts of `arm()` calls therefore collapse into a
//! single callback after the last one.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::error;

struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

struct TimerInner {
    state: Mutex<TimerState>,
    cond: Condvar,
}

/// Debounce timer backed by a dedicated thread.
pub struct Debouncer {
    inner: Arc<TimerInner>,
    delay: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Start a timer thread named `stash-debounce-<label>`.
    ///
    /// `on_fire` runs on the timer thread without any lock held.
    pub fn new(label: &str, delay: Duration, on_fire: impl Fn() + Send + 'static) -> Self {
        let inner = Arc::new(TimerInner {
            state: Mutex::new(TimerState {
                deadline: None,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let inner_clone = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name(format!("stash-debounce-{}", label))
            .spawn(move || timer_loop(&inner_clone, on_fire))
            .expect("failed to spawn debounce timer thread");

        Debouncer {
            inner,
            delay,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Delay between the last `arm()` and the callback
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending deadline and set a new one `delay` from now.
    pub fn arm(&self) {
        let mut state = self.inner.state.lock();
        if state.shutdown {
            return;
        }
        state.deadline = Some(Instant::now() + self.delay);
        self.inner.cond.notify_one();
    }

    /// Clear the pending deadline, if any.
    ///
    /// Returns true if a deadline was pending. A callback that has already
    /// started is not affected.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock();
        let was_armed = state.deadline.take().is_some();
        if was_armed {
            self.inner.cond.notify_one();
        }
        was_armed
    }

    /// Returns true if a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.inner.state.lock().deadline.is_some()
    }

    /// Drop any pending deadline and join the timer thread. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
            state.deadline = None;
            self.inner.cond.notify_all();
        }

        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn timer_loop(inner: &TimerInner, on_fire: impl Fn()) {
    let mut state = inner.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        match state.deadline {
            None => inner.cond.wait(&mut state),
            Some(deadline) if Instant::now() >= deadline => {
                state.deadline = None;
                MutexGuard::unlocked(&mut state, || {
                    if let Err(e) =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(&on_fire))
                    {
                        error!(
                            target: "stash::persist",
                            "debounce callback panicked: {:?}",
                            e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
                        );
                    }
                });
            }
            Some(deadline) => {
                let _ = inner.cond.wait_until(&mut state, deadline);
            }
        }
    }
}
