//! Distribution metric backed by a uniform reservoir sample.
//!
//! The reservoir keeps at most `size` values using Vitter's algorithm R, so
//! percentiles stay representative of the whole stream at fixed memory.

use std::sync::Mutex;

use rand::Rng;

use crate::lock;

/// Reservoir size used by [`Histogram::new`].
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

#[derive(Debug)]
struct Reservoir {
    /// Updates seen since creation or the last clear.
    count: i64,
    values: Vec<i64>,
    size: usize,
}

#[derive(Debug)]
pub struct Histogram {
    reservoir: Mutex<Reservoir>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_reservoir_size(DEFAULT_RESERVOIR_SIZE)
    }

    pub fn with_reservoir_size(size: usize) -> Self {
        let size = size.max(1);
        Self {
            reservoir: Mutex::new(Reservoir {
                count: 0,
                values: Vec::with_capacity(size.min(DEFAULT_RESERVOIR_SIZE)),
                size,
            }),
        }
    }

    pub fn update(&self, v: i64) {
        let mut r = lock(&self.reservoir);
        r.count += 1;
        if r.values.len() < r.size {
            r.values.push(v);
        } else {
            let idx = rand::thread_rng().gen_range(0..r.count) as usize;
            if idx < r.size {
                r.values[idx] = v;
            }
        }
    }

    pub fn count(&self) -> i64 {
        lock(&self.reservoir).count
    }

    pub fn clear(&self) {
        let mut r = lock(&self.reservoir);
        r.count = 0;
        r.values.clear();
    }

    /// Copy the current sample out under the lock.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let r = lock(&self.reservoir);
        HistogramSnapshot::new(r.count, r.values.clone())
    }
}

/// Frozen view of a histogram. Values are kept sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    count: i64,
    values: Vec<i64>,
}

impl HistogramSnapshot {
    fn new(count: i64, mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { count, values }
    }

    /// A snapshot whose sample is exactly `values`.
    pub fn from_values(values: Vec<i64>) -> Self {
        let count = values.len() as i64;
        Self::new(count, values)
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Sum of the sample, widened so large values cannot overflow.
    pub fn sum(&self) -> i128 {
        self.values.iter().map(|&v| i128::from(v)).sum()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum() as f64 / self.values.len() as f64
    }

    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sq: f64 = self
            .values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        sq / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Value at percentile `p` (0.0..=1.0), interpolating between the two
    /// nearest samples.
    pub fn percentile(&self, p: f64) -> f64 {
        let size = self.values.len();
        if size == 0 {
            return 0.0;
        }
        let pos = p * (size + 1) as f64;
        if pos < 1.0 {
            self.values[0] as f64
        } else if pos >= size as f64 {
            self.values[size - 1] as f64
        } else {
            let lower = self.values[pos as usize - 1] as f64;
            let upper = self.values[pos as usize] as f64;
            lower + (pos - pos.floor()) * (upper - lower)
        }
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|&p| self.percentile(p)).collect()
    }
}
