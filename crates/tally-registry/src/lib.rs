//! tally-registry: the in-process metrics a host application updates.
//!
//! Every metric is safe to update from any thread. Distribution-like kinds
//! (histograms, meters, timers) are read through immutable snapshots so a
//! reader sees one consistent view while writers keep going.
//!
//! # Architecture
//!
//! ```text
//! Registry (name → Metric)
//!   ├── Counter / Gauge / GaugeFloat   single atomic word
//!   ├── Histogram                      uniform reservoir sample
//!   ├── Meter                          count + 1/5/15-minute EWMA rates
//!   ├── Timer                          Histogram (nanoseconds) + Meter
//!   └── Healthcheck                    not exported, checked on demand
//! ```

pub mod counter;
pub mod error;
pub mod gauge;
pub mod healthcheck;
pub mod histogram;
pub mod meter;
pub mod registry;
pub mod timer;

pub use counter::Counter;
pub use error::{RegistryError, RegistryResult};
pub use gauge::{Gauge, GaugeFloat};
pub use healthcheck::Healthcheck;
pub use histogram::{Histogram, HistogramSnapshot};
pub use meter::{Meter, MeterSnapshot};
pub use registry::{Metric, Registry};
pub use timer::{Timer, TimerSnapshot};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a metric's inner state, ignoring poisoning.
///
/// Metric state is plain numbers; a panicking writer cannot leave it in a
/// shape later readers cannot handle.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
