//! The reporter runs the periodic collect → batch → submit loop.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use tally_core::{ConfigError, ConfigResult, TallyConfig};
use tally_registry::Registry;

use crate::batch::batches;
use crate::collector::{CollectOptions, Collector};
use crate::filter::{FilterPolicy, RuleFilter};
use crate::sink::MetricSink;

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub points: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Exports a registry to a sink on a fixed interval.
pub struct Reporter {
    registry: Arc<Registry>,
    collector: Collector,
    sink: Arc<dyn MetricSink>,
    namespace: String,
    interval: Duration,
    max_batch_size: NonZeroUsize,
    flush_on_shutdown: bool,
    debug: bool,
}

impl Reporter {
    /// Build a reporter from a validated view of `config`, using a
    /// `RuleFilter` compiled from its `[filter]` section.
    pub fn new(
        registry: Arc<Registry>,
        config: &TallyConfig,
        sink: Arc<dyn MetricSink>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let policy = RuleFilter::from_config(&config.filter)?;
        let max_batch_size = NonZeroUsize::new(config.max_batch_size).ok_or(
            ConfigError::InvalidBatchSize {
                value: config.max_batch_size,
                max: tally_core::MAX_BATCH_SIZE,
            },
        )?;

        let options = CollectOptions {
            dimensions: config.dimensions(),
            reset_counters: config.reset_counters,
            debug: config.debug,
        };

        Ok(Self {
            registry,
            collector: Collector::new(Arc::new(policy), options),
            sink,
            namespace: config.namespace.clone(),
            interval: config.interval()?,
            max_batch_size,
            flush_on_shutdown: config.flush_on_shutdown,
            debug: config.debug,
        })
    }

    /// Replace the config-driven filter with a custom policy.
    pub fn with_policy(mut self, policy: Arc<dyn FilterPolicy>) -> Self {
        let options = self.collector.options().clone();
        self.collector = Collector::new(policy, options);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle: collect, batch, and submit every batch in order.
    ///
    /// A failed batch is logged and dropped; the remaining batches are
    /// still submitted.
    pub async fn report_once(&self) -> CycleStats {
        let data = self.collector.collect(&self.registry);
        let mut stats = CycleStats {
            points: data.len(),
            ..Default::default()
        };

        for batch in batches(&data, self.max_batch_size) {
            stats.batches += 1;
            match self.sink.submit(&self.namespace, batch).await {
                Ok(()) => {
                    if self.debug {
                        debug!(
                            namespace = %self.namespace,
                            sink = self.sink.name(),
                            count = batch.len(),
                            "put metrics"
                        );
                    }
                }
                Err(e) => {
                    stats.failed_batches += 1;
                    error!(
                        namespace = %self.namespace,
                        sink = self.sink.name(),
                        count = batch.len(),
                        error = %e,
                        "failed to submit metric batch"
                    );
                }
            }
        }

        trace!(
            points = stats.points,
            batches = stats.batches,
            failed = stats.failed_batches,
            "metrics cycle complete"
        );
        stats
    }

    /// Run the reporting loop until shutdown signal.
    ///
    /// Ticks that arrive while a cycle is still running are skipped rather
    /// than queued, so cycles never overlap or burst. Shutdown is only
    /// observed between cycles.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            namespace = %self.namespace,
            sink = self.sink.name(),
            interval_ms = self.interval.as_millis() as u64,
            "metrics reporter started"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.report_once().await;
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        info!("metrics reporter shutting down");
        if self.flush_on_shutdown {
            let stats = self.report_once().await;
            debug!(points = stats.points, "final metrics flush");
        }
    }
}
