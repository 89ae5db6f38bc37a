//! Rate-limit pacing. All waiting goes through a `Clock` so tests can swap in
//! `ManualClock` and run without real delays.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Deterministic clock: `sleep` advances time instantly. Clones share state.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
    slept: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), elapsed: Rc::default(), slept: Rc::default() }
    }

    /// Move time forward without it counting as sleep.
    pub fn advance(&self, d: Duration) {
        self.elapsed.set(self.elapsed.get() + d);
    }

    /// Total time spent in `sleep`.
    pub fn total_slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
        self.slept.set(self.slept.get() + d);
    }
}

/// Scheduling policy consulted before every remote request.
pub trait Pacer {
    fn wait_if_needed(&mut self);
}

/// Keeps at least `min_interval` between the starts of consecutive requests,
/// which bounds the long-run rate at `1 / min_interval`.
#[derive(Debug)]
pub struct IntervalPacer<C: Clock> {
    clock: C,
    min_interval: Duration,
    last: Option<Instant>,
}

impl<C: Clock> IntervalPacer<C> {
    pub fn new(clock: C, min_interval: Duration) -> Self {
        Self { clock, min_interval, last: None }
    }
}

impl<C: Clock> Pacer for IntervalPacer<C> {
    fn wait_if_needed(&mut self) {
        if let Some(last) = self.last {
            let since = self.clock.now().saturating_duration_since(last);
            if since < self.min_interval {
                self.clock.sleep(self.min_interval - since);
            }
        }
        self.last = Some(self.clock.now());
    }
}
