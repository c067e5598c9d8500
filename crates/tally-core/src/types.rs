//! Shared types used across tally crates.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

/// Maximum number of data points the backend accepts in one request.
pub const MAX_BATCH_SIZE: usize = 20;

/// Unit attached to an exported data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    /// Pass-through numeric count (counters and gauges).
    Count,
    /// No unit (rates and percentiles).
    None,
}

/// A single key/value tag attached to every data point of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// The static dimension set, sorted by name and shared by reference.
///
/// Cloning is an `Arc` bump, so every data point of a cycle points at the
/// same allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions(Arc<[Dimension]>);

impl Dimensions {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let dims: Vec<Dimension> = sorted
            .into_iter()
            .map(|(name, value)| Dimension { name, value })
            .collect();
        Self(dims.into())
    }

    pub fn as_slice(&self) -> &[Dimension] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both sets share the same allocation.
    pub fn ptr_eq(&self, other: &Dimensions) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<&HashMap<String, String>> for Dimensions {
    fn from(map: &HashMap<String, String>) -> Self {
        Dimensions::new(map.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl Serialize for Dimensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// One exported measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub name: String,
    pub value: f64,
    pub unit: Unit,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
    pub dimensions: Dimensions,
}

impl DataPoint {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        unit: Unit,
        timestamp: SystemTime,
        dimensions: &Dimensions,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            timestamp,
            dimensions: dimensions.clone(),
        }
    }
}

/// Milliseconds since the Unix epoch; pre-epoch instants clamp to zero.
pub fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn serialize_epoch_millis<S: Serializer>(t: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(epoch_millis(*t))
}
