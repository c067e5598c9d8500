//! Translation of one registry metric into exported data points.

use std::time::SystemTime;

use tracing::{debug, trace};

use tally_core::{DataPoint, Dimensions, Unit};
use tally_registry::{Counter, HistogramSnapshot, MeterSnapshot, Metric, TimerSnapshot};

use crate::filter::FilterPolicy;

/// Builds data points for a single collection cycle.
///
/// Every point shares the cycle's timestamp and the same dimensions
/// allocation, so points from different metrics line up exactly at query
/// time.
#[derive(Debug, Clone)]
pub struct DatumBuilder<'a> {
    timestamp: SystemTime,
    dimensions: &'a Dimensions,
    reset_counters: bool,
    debug: bool,
}

impl<'a> DatumBuilder<'a> {
    pub fn new(timestamp: SystemTime, dimensions: &'a Dimensions) -> Self {
        Self {
            timestamp,
            dimensions,
            reset_counters: false,
            debug: false,
        }
    }

    /// Clear counters once their value has been captured.
    pub fn reset_counters(mut self, reset: bool) -> Self {
        self.reset_counters = reset;
        self
    }

    /// Log skipped metrics and snapshots at debug level instead of trace.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Append the data points for `metric` to `out`.
    ///
    /// Distribution-like metrics are snapshotted exactly once here. Kinds
    /// with nothing to export are skipped without error.
    pub fn build(
        &self,
        name: &str,
        metric: &Metric,
        policy: &dyn FilterPolicy,
        out: &mut Vec<DataPoint>,
    ) {
        match metric {
            Metric::Counter(c) => self.counter(name, c, out),
            Metric::Gauge(g) => self.gauge(name, g.value() as f64, out),
            Metric::GaugeFloat(g) => self.gauge(name, g.value(), out),
            Metric::Histogram(h) => {
                self.histogram(name, &h.snapshot(), policy.percentiles(name), out)
            }
            Metric::Meter(m) => self.meter(name, &m.snapshot(), out),
            Metric::Timer(t) => self.timer(name, &t.snapshot(), policy.percentiles(name), out),
            Metric::Healthcheck(_) => self.skip(name, metric.kind(), "no numeric value"),
        }
    }

    pub fn counter(&self, name: &str, counter: &Counter, out: &mut Vec<DataPoint>) {
        let count = if self.reset_counters {
            counter.take()
        } else {
            counter.count()
        };
        if count > 0 {
            out.push(self.point(name, count as f64, Unit::Count));
        }
    }

    pub fn gauge(&self, name: &str, value: f64, out: &mut Vec<DataPoint>) {
        out.push(self.point(name, value, Unit::Count));
    }

    /// Percentile points only; histograms export no count or mean.
    pub fn histogram(
        &self,
        name: &str,
        snapshot: &HistogramSnapshot,
        percentiles: &[f64],
        out: &mut Vec<DataPoint>,
    ) {
        if snapshot.count() == 0 {
            self.skip(name, "histogram", "empty snapshot");
            return;
        }
        if self.debug {
            debug!(
                %name,
                count = snapshot.count(),
                min = snapshot.min(),
                max = snapshot.max(),
                mean = snapshot.mean(),
                "histogram snapshot"
            );
        }
        self.percentile_points(name, percentiles, |p| snapshot.percentile(p), out);
    }

    /// Meters are always exported, even with a zero count.
    pub fn meter(&self, name: &str, snapshot: &MeterSnapshot, out: &mut Vec<DataPoint>) {
        self.rate_points(name, snapshot, out);
    }

    pub fn timer(
        &self,
        name: &str,
        snapshot: &TimerSnapshot,
        percentiles: &[f64],
        out: &mut Vec<DataPoint>,
    ) {
        if snapshot.count() == 0 {
            self.skip(name, "timer", "empty snapshot");
            return;
        }
        let rates = MeterSnapshot {
            count: snapshot.count(),
            ..snapshot.meter
        };
        self.rate_points(name, &rates, out);
        self.percentile_points(name, percentiles, |p| snapshot.percentile(p), out);
    }

    fn rate_points(&self, name: &str, snapshot: &MeterSnapshot, out: &mut Vec<DataPoint>) {
        let rates = [
            ("count", snapshot.count as f64),
            ("one-minute", snapshot.rate1),
            ("five-minute", snapshot.rate5),
            ("fifteen-minute", snapshot.rate15),
            ("mean", snapshot.rate_mean),
        ];
        for (suffix, value) in rates {
            out.push(self.point(format!("{name}.{suffix}"), value, Unit::None));
        }
    }

    fn percentile_points(
        &self,
        name: &str,
        percentiles: &[f64],
        value_at: impl Fn(f64) -> f64,
        out: &mut Vec<DataPoint>,
    ) {
        for &p in percentiles {
            out.push(self.point(format!("{name}-perc{p:.3}"), value_at(p), Unit::None));
        }
    }

    fn point(&self, name: impl Into<String>, value: f64, unit: Unit) -> DataPoint {
        DataPoint::new(name, value, unit, self.timestamp, self.dimensions)
    }

    fn skip(&self, name: &str, kind: &str, reason: &str) {
        if self.debug {
            debug!(%name, %kind, %reason, "metric skipped");
        } else {
            trace!(%name, %kind, %reason, "metric skipped");
        }
    }
}
