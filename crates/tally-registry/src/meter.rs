//! Rate metric: event count plus exponentially-weighted moving averages.
//!
//! The 1/5/15-minute averages advance in fixed 5 second ticks. There is no
//! background ticker; every mark and snapshot first catches up on the ticks
//! that elapsed since the previous one.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::lock;

const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    /// Events per second.
    rate: f64,
    init: bool,
}

impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp(),
            rate: 0.0,
            init: false,
        }
    }

    fn tick(&mut self, uncounted: i64) {
        let instant_rate = uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        if self.init {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.init = true;
        }
    }

    /// Apply `ticks` ticks with no events.
    fn decay(&mut self, ticks: u128) {
        if ticks > 0 {
            self.rate *= (1.0 - self.alpha).powf(ticks as f64);
        }
    }
}

#[derive(Debug)]
struct MeterState {
    count: i64,
    /// Events since the last tick.
    uncounted: i64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start: Instant,
    last_tick: Instant,
}

impl MeterState {
    fn tick_until(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let tick_nanos = TICK_INTERVAL.as_nanos();
        let ticks = elapsed.as_nanos() / tick_nanos;
        if ticks == 0 {
            return;
        }

        // Only the first tick sees pending events; the rest decay toward zero.
        let uncounted = std::mem::take(&mut self.uncounted);
        for ewma in [&mut self.m1, &mut self.m5, &mut self.m15] {
            ewma.tick(uncounted);
            ewma.decay(ticks - 1);
        }

        let remainder = elapsed.as_nanos() % tick_nanos;
        self.last_tick = now - Duration::from_nanos(remainder as u64);
    }
}

#[derive(Debug)]
pub struct Meter {
    state: Mutex<MeterState>,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub(crate) fn starting_at(now: Instant) -> Self {
        Self {
            state: Mutex::new(MeterState {
                count: 0,
                uncounted: 0,
                m1: Ewma::with_minutes(1.0),
                m5: Ewma::with_minutes(5.0),
                m15: Ewma::with_minutes(15.0),
                start: now,
                last_tick: now,
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: i64) {
        self.mark_at(n, Instant::now());
    }

    pub(crate) fn mark_at(&self, n: i64, now: Instant) {
        let mut s = lock(&self.state);
        s.tick_until(now);
        s.count += n;
        s.uncounted += n;
    }

    pub fn count(&self) -> i64 {
        lock(&self.state).count
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut s = lock(&self.state);
        s.tick_until(now);
        let elapsed = now.saturating_duration_since(s.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            s.count as f64 / elapsed
        } else {
            0.0
        };
        MeterSnapshot {
            count: s.count,
            rate1: s.m1.rate,
            rate5: s.m5.rate,
            rate15: s.m15.rate,
            rate_mean,
        }
    }
}

/// Frozen view of a meter. Rates are events per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}
