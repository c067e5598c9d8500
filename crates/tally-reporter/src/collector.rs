//! Metrics collector. Walks the registry and gathers one cycle's points.
//!
//! The collector never fails: metrics the filter rejects are left untouched
//! (no counter reset), and kinds with nothing to export contribute nothing.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::trace;

use tally_core::{DataPoint, Dimensions};
use tally_registry::Registry;

use crate::datum::DatumBuilder;
use crate::filter::FilterPolicy;

/// Per-cycle translation settings, fixed for the reporter's lifetime.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub dimensions: Dimensions,
    pub reset_counters: bool,
    pub debug: bool,
}

pub struct Collector {
    policy: Arc<dyn FilterPolicy>,
    options: CollectOptions,
}

impl Collector {
    pub fn new(policy: Arc<dyn FilterPolicy>, options: CollectOptions) -> Self {
        Self { policy, options }
    }

    pub fn options(&self) -> &CollectOptions {
        &self.options
    }

    /// Collect every reportable metric, stamped with the current time.
    pub fn collect(&self, registry: &Registry) -> Vec<DataPoint> {
        self.collect_at(registry, SystemTime::now())
    }

    /// Collect every reportable metric, stamped with `timestamp`.
    pub fn collect_at(&self, registry: &Registry, timestamp: SystemTime) -> Vec<DataPoint> {
        let builder = DatumBuilder::new(timestamp, &self.options.dimensions)
            .reset_counters(self.options.reset_counters)
            .debug(self.options.debug);

        let mut data = Vec::new();
        registry.each(|name, metric| {
            if !self.policy.should_report(name) {
                trace!(%name, "metric filtered out");
                return;
            }
            builder.build(name, metric, self.policy.as_ref(), &mut data);
        });
        data
    }
}
