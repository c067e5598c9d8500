use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic-until-reset integer metric.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    /// Read the current count and reset it to zero in one atomic step.
    ///
    /// Increments racing with the reset land either in the returned value
    /// or in the next one, never in neither.
    pub fn take(&self) -> i64 {
        self.count.swap(0, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn inc_dec_clear() {
        let c = Counter::new();
        c.inc(5);
        c.dec(2);
        assert_eq!(c.count(), 3);
        c.clear();
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn take_returns_value_and_resets() {
        let c = Counter::new();
        c.inc(7);
        assert_eq!(c.take(), 7);
        assert_eq!(c.count(), 0);
        assert_eq!(c.take(), 0);
    }

    #[test]
    fn take_loses_nothing_under_contention() {
        let c = Arc::new(Counter::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        c.inc(1);
                    }
                })
            })
            .collect();

        let mut taken = 0;
        for _ in 0..100 {
            taken += c.take();
        }
        for w in writers {
            w.join().unwrap();
        }
        taken += c.take();
        assert_eq!(taken, 40_000);
    }
}
