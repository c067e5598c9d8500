use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tally_core::DataPoint;

use super::{BoxFuture, MetricSink};
use crate::error::{SinkError, SinkResult};

#[derive(Debug, Default)]
struct Recorded {
    batches: Vec<(String, Vec<DataPoint>)>,
    attempts: usize,
    /// Zero-based attempt numbers that should be rejected.
    failures: HashSet<usize>,
}

/// Keeps every accepted batch in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    recorded: Mutex<Recorded>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the given submit attempts (zero-based, counting every call).
    pub fn fail_attempts(&self, attempts: impl IntoIterator<Item = usize>) {
        self.lock().failures.extend(attempts);
    }

    /// Accepted batches, in submission order.
    pub fn batches(&self) -> Vec<Vec<DataPoint>> {
        self.lock().batches.iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.lock().batches.iter().map(|(ns, _)| ns.clone()).collect()
    }

    /// Every accepted data point, flattened in submission order.
    pub fn points(&self) -> Vec<DataPoint> {
        self.lock()
            .batches
            .iter()
            .flat_map(|(_, b)| b.iter().cloned())
            .collect()
    }

    /// Submit calls seen so far, accepted or not.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, namespace: &str, batch: &[DataPoint]) -> SinkResult<()> {
        let mut recorded = self.lock();
        let attempt = recorded.attempts;
        recorded.attempts += 1;
        if recorded.failures.contains(&attempt) {
            return Err(SinkError::Rejected(format!("attempt {attempt}")));
        }
        recorded.batches.push((namespace.to_string(), batch.to_vec()));
        Ok(())
    }
}

impl MetricSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn submit<'a>(
        &'a self,
        namespace: &'a str,
        batch: &'a [DataPoint],
    ) -> BoxFuture<'a, SinkResult<()>> {
        let result = self.record(namespace, batch);
        Box::pin(std::future::ready(result))
    }
}
