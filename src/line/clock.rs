use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use crate::phy::timing::HalfPeriodWait;

/// Source of edge timestamps, in nanoseconds.
pub trait Clock {
    fn now_ns(&self) -> i64;
}

/// Wall clock relative to its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }
}

/// Virtual time that only moves when advanced. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Arc<AtomicI64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ns: i64) {
        self.now.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_ns(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Half-period wait that advances a `SimClock` instead of sleeping.
#[derive(Debug, Clone)]
pub struct SimWait {
    clock: SimClock,
    half_period_ns: i64,
}

impl SimWait {
    pub fn new(clock: SimClock, half_period_ns: u64) -> Self {
        Self {
            clock,
            half_period_ns: half_period_ns as i64,
        }
    }
}

impl HalfPeriodWait for SimWait {
    fn wait(&mut self) {
        self.clock.advance(self.half_period_ns);
    }
}
