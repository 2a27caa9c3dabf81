//! A hashed-wheel timer for firing deferred callbacks with millisecond
//! granularity.
//!
//! The wheel is a ring of slot buckets, each holding entries tagged with a
//! rotation counter (`rounds`). The tick driver advances one slot per tick;
//! an entry fires once its bucket has been visited `rounds` times with
//! `rounds` decremented on each pass. Callbacks run off the tick task (each
//! fire is its own spawned task) so a slow callback never stalls the wheel.
//!
//! ```no_run
//! use std::time::Duration;
//! use taskwheel_timer::Wheel;
//!
//! # async fn go() {
//! let wheel = Wheel::new(Duration::from_millis(10));
//! wheel.start();
//! wheel.schedule(Duration::from_secs(3), || async {
//!     println!("fired");
//!     Ok(())
//! });
//! # wheel.stop();
//! # }
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Number of slots in the wheel. 256 is enough headroom that, at a 10ms
/// tick, a full revolution is ~2.56s before `rounds` bookkeeping is needed
/// at all for near-term timers.
const SLOT_COUNT: usize = 256;

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// A boxed, one-shot, fallible async callback.
type CallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type Callback = Box<dyn FnOnce() -> CallbackFuture + Send>;

struct Entry {
    rounds: u64,
    callback: Callback,
}

struct Inner {
    tick: Duration,
    slots: Vec<Mutex<Vec<Entry>>>,
    current: AtomicUsize,
    state: AtomicU8,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// A hashed-wheel timer. Cheap to clone (an `Arc` handle around the shared
/// wheel state) — clone it into tasks that need to register callbacks.
#[derive(Clone)]
pub struct Wheel {
    inner: Arc<Inner>,
}

impl Wheel {
    /// Build a new wheel with the given tick duration. The wheel starts in
    /// the `Created` state; call [`Wheel::start`] to begin driving it.
    pub fn new(tick: Duration) -> Self {
        let mut slots = Vec::with_capacity(SLOT_COUNT);
        for _ in 0..SLOT_COUNT {
            slots.push(Mutex::new(Vec::new()));
        }
        Self {
            inner: Arc::new(Inner {
                tick,
                slots,
                current: AtomicUsize::new(0),
                state: AtomicU8::new(STATE_CREATED),
                driver: Mutex::new(None),
            }),
        }
    }

    /// Start the tick driver. No-op if already running or stopped.
    pub fn start(&self) {
        if self
            .inner
            .state
            .compare_exchange(
                STATE_CREATED,
                STATE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(Self::drive(inner));
        *self.inner.driver.lock().unwrap() = Some(handle);
    }

    /// Stop the wheel. Idempotent. Pending entries are abandoned — no
    /// further callbacks fire after this returns.
    pub fn stop(&self) {
        self.inner.state.store(STATE_STOPPED, Ordering::SeqCst);
        if let Some(handle) = self.inner.driver.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Register a one-shot callback to fire no earlier than `after`. Under
    /// normal load it fires within one tick of the deadline. `after` of
    /// zero (or any value that rounds below one tick) fires on the very
    /// next tick.
    ///
    /// If the wheel is not running (not yet started, or already stopped)
    /// this is a silent no-op, per contract — callers that need the
    /// callback to definitely run should not schedule after `stop()`.
    pub fn schedule<F, Fut>(&self, after: Duration, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.inner.state.load(Ordering::SeqCst) != STATE_RUNNING {
            tracing::debug!("schedule() called while wheel is not running, dropping callback");
            return;
        }

        let tick_ms = self.inner.tick.as_millis().max(1) as u64;
        let after_ms = after.as_millis() as u64;
        let ticks = if after_ms == 0 {
            1
        } else {
            after_ms.div_ceil(tick_ms).max(1)
        };

        let current = self.inner.current.load(Ordering::SeqCst) as u64;
        let slot = ((current + ticks) % SLOT_COUNT as u64) as usize;
        let rounds = ticks / SLOT_COUNT as u64;

        let entry = Entry {
            rounds,
            callback: Box::new(move || Box::pin(callback())),
        };
        self.inner.slots[slot].lock().unwrap().push(entry);
    }

    async fn drive(inner: Arc<Inner>) {
        let mut interval = tokio::time::interval(inner.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if inner.state.load(Ordering::SeqCst) != STATE_RUNNING {
                return;
            }

            let prev = inner.current.load(Ordering::SeqCst);
            let next = (prev + 1) % SLOT_COUNT;
            inner.current.store(next, Ordering::SeqCst);

            let fired = {
                let mut bucket = inner.slots[next].lock().unwrap();
                let mut remaining = Vec::with_capacity(bucket.len());
                let mut fired = Vec::new();
                for mut entry in bucket.drain(..) {
                    if entry.rounds == 0 {
                        fired.push(entry.callback);
                    } else {
                        entry.rounds -= 1;
                        remaining.push(entry);
                    }
                }
                *bucket = remaining;
                fired
            };

            for callback in fired {
                tokio::spawn(Self::run_callback(callback));
            }
        }
    }

    async fn run_callback(callback: Callback) {
        match AssertUnwindSafe(callback()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "timer callback returned an error"),
            Err(_) => tracing::error!("timer callback panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn fires_after_delay() {
        let wheel = Wheel::new(Duration::from_millis(5));
        wheel.start();

        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        wheel.schedule(Duration::from_millis(20), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        wheel.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_delay_fires_on_next_tick() {
        let wheel = Wheel::new(Duration::from_millis(5));
        wheel.start();

        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        wheel.schedule(Duration::ZERO, move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        wheel.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_abandons_pending_callbacks() {
        let wheel = Wheel::new(Duration::from_millis(5));
        wheel.start();

        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        wheel.schedule(Duration::from_secs(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        wheel.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let wheel = Wheel::new(Duration::from_millis(10));
        wheel.start();
        wheel.stop();
        wheel.stop();
    }

    #[tokio::test]
    async fn schedule_after_stop_is_silent_noop() {
        let wheel = Wheel::new(Duration::from_millis(5));
        wheel.start();
        wheel.stop();

        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        wheel.schedule(Duration::ZERO, move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn many_concurrent_timers_all_fire() {
        let wheel = Wheel::new(Duration::from_millis(5));
        wheel.start();

        let counter = Arc::new(AtomicU32::new(0));
        for i in 0..300u64 {
            let c = Arc::clone(&counter);
            wheel.schedule(Duration::from_millis(i), move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        wheel.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 300);
    }
}
