//! Time source for the store.
//!
//! The lock wait and the `modified` timestamps both go through [`Clock`], so
//! tests can drive a full wait-and-timeout cycle with [`ManualClock`]
//! without sleeping on the wall clock.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of the current time and of blocking waits.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Utc::now` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

type SleepHook = Box<dyn FnMut(DateTime<Utc>) + Send>;

/// Deterministic clock. `sleep` advances the time instantly.
///
/// An optional hook runs after every sleep with the new time, which lets a
/// test release a lock "while" a reader is waiting. The hook must not call
/// `sleep` on the same clock.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    slept: Mutex<Duration>,
    on_sleep: Mutex<Option<SleepHook>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            slept: Mutex::new(Duration::ZERO),
            on_sleep: Mutex::new(None),
        }
    }

    /// Create a clock frozen at the current wall time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward without counting it as sleep.
    pub fn advance(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        let mut now = guard(&self.now);
        if let Some(next) = now.checked_add_signed(step) {
            *now = next;
        }
    }

    /// Total time spent in `sleep` so far.
    pub fn slept(&self) -> Duration {
        *guard(&self.slept)
    }

    /// Install a hook that runs after each sleep.
    pub fn on_sleep(&self, hook: impl FnMut(DateTime<Utc>) + Send + 'static) {
        *guard(&self.on_sleep) = Some(Box::new(hook));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_now()
    }
}

impl std::fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &*guard(&self.now))
            .field("slept", &*guard(&self.slept))
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *guard(&self.now)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        *guard(&self.slept) += duration;
        let now = self.now();
        if let Some(hook) = guard(&self.on_sleep).as_mut() {
            hook(now);
        }
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
