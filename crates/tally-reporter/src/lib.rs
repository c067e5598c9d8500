//! tally-reporter: periodic export of an in-process metrics registry.
//!
//! Every tick the reporter walks the registry, turns each metric into
//! uniform data points, slices them into batches the backend accepts, and
//! submits the batches in order. A failed batch is logged and dropped.
//!
//! # Architecture
//!
//! ```text
//! Reporter::run()  ← periodic, cancellable via watch channel
//!   └── report_once()
//!         ├── Collector::collect()   registry → Vec<DataPoint>
//!         │     ├── FilterPolicy     report? which percentiles?
//!         │     └── DatumBuilder     one metric → 0..n data points
//!         ├── batches()              Vec<DataPoint> → [≤20] slices
//!         └── MetricSink::submit()   log / http / memory
//! ```

pub mod batch;
pub mod collector;
pub mod datum;
pub mod error;
pub mod filter;
pub mod reporter;
pub mod sink;

pub use batch::batches;
pub use collector::{CollectOptions, Collector};
pub use datum::DatumBuilder;
pub use error::{SinkError, SinkResult};
pub use filter::{AllowAll, FilterPolicy, RuleFilter};
pub use reporter::{CycleStats, Reporter};
pub use sink::{HttpSink, LogSink, MemorySink, MetricSink};
