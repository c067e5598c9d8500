//! Transport sinks that receive batches of data points.

mod http;
mod log;
mod memory;

use std::future::Future;
use std::pin::Pin;

use tally_core::DataPoint;

use crate::error::SinkResult;

pub use self::http::HttpSink;
pub use self::log::LogSink;
pub use self::memory::MemorySink;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Destination for exported batches.
///
/// A batch never exceeds the configured maximum size. Failures are
/// reported, never retried, by the caller.
pub trait MetricSink: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn submit<'a>(
        &'a self,
        namespace: &'a str,
        batch: &'a [DataPoint],
    ) -> BoxFuture<'a, SinkResult<()>>;
}
