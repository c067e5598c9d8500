use tracing::{debug, info};

use tally_core::DataPoint;

use super::{BoxFuture, MetricSink};
use crate::error::SinkResult;

/// Writes every batch to the log. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn submit<'a>(
        &'a self,
        namespace: &'a str,
        batch: &'a [DataPoint],
    ) -> BoxFuture<'a, SinkResult<()>> {
        Box::pin(async move {
            info!(%namespace, count = batch.len(), "metric batch");
            for point in batch {
                debug!(
                    %namespace,
                    name = %point.name,
                    value = point.value,
                    unit = ?point.unit,
                    "metric data point"
                );
            }
            Ok(())
        })
    }
}
