//! Process self-metrics.
//!
//! The daemon reports on itself so that a running `tallyd` always has
//! something to export: uptime, a heartbeat counter, probe tick rate and
//! latency, and how late each probe tick fired.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use tally_registry::{
    Counter, GaugeFloat, Healthcheck, Histogram, Meter, Metric, Registry, RegistryResult, Timer,
};

pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Probes older than this many intervals mark the daemon unhealthy.
const STALE_PROBES: u64 = 5;

pub struct SelfMetrics {
    started: Instant,
    uptime: Arc<GaugeFloat>,
    heartbeats: Arc<Counter>,
    ticks: Arc<Meter>,
    tick_latency: Arc<Timer>,
    tick_jitter: Arc<Histogram>,
    health: Arc<Healthcheck>,
    /// Milliseconds since `started` at the last completed probe.
    last_probe_ms: Arc<AtomicU64>,
}

impl SelfMetrics {
    pub fn register(registry: &Registry) -> RegistryResult<Self> {
        let started = Instant::now();
        let last_probe_ms = Arc::new(AtomicU64::new(0));

        let seen = last_probe_ms.clone();
        let stale_after = PROBE_INTERVAL.as_millis() as u64 * STALE_PROBES;
        let health = Arc::new(Healthcheck::new(move |h| {
            let now = started.elapsed().as_millis() as u64;
            let last = seen.load(Ordering::Relaxed);
            if now.saturating_sub(last) > stale_after {
                h.unhealthy(format!("no probe for {}ms", now - last));
            } else {
                h.healthy();
            }
        }));
        registry.register("tallyd.probe.health", Metric::Healthcheck(health.clone()))?;

        Ok(Self {
            started,
            uptime: registry.gauge_float("tallyd.uptime_seconds")?,
            heartbeats: registry.counter("tallyd.heartbeats")?,
            ticks: registry.meter("tallyd.probe.ticks")?,
            tick_latency: registry.timer("tallyd.probe.latency")?,
            tick_jitter: registry.histogram("tallyd.probe.jitter_us")?,
            health,
            last_probe_ms,
        })
    }

    /// Record one probe tick that was due at `due`.
    pub fn probe(&self, due: Instant) {
        let start = Instant::now();

        let late = start.saturating_duration_since(due);
        self.tick_jitter.update(late.as_micros() as i64);
        self.uptime.update(self.started.elapsed().as_secs_f64());
        self.heartbeats.inc(1);
        self.ticks.mark(1);
        self.last_probe_ms
            .store(self.started.elapsed().as_millis() as u64, Ordering::Relaxed);

        self.tick_latency.update(start.elapsed());
    }

    pub fn check_health(&self) -> Option<String> {
        self.health.check();
        self.health.error()
    }

    /// Probe on every [`PROBE_INTERVAL`] until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(PROBE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                due = ticker.tick() => {
                    self.probe(due);
                    if let Some(err) = self.check_health() {
                        warn!(error = %err, "self-metrics probe unhealthy");
                    }
                }
                _ = shutdown.changed() => {
                    debug!("self-metrics probe shutting down");
                    break;
                }
            }
        }
    }
}
