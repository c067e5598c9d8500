//! Name → metric map shared between the host application and reporters.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::{Counter, Gauge, GaugeFloat, Healthcheck, Histogram, Meter, Timer};

/// A registered metric. Cloning shares the underlying metric.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeFloat(Arc<GaugeFloat>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    Healthcheck(Arc<Healthcheck>),
}

impl Metric {
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::GaugeFloat(_) => "gauge_float",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
            Metric::Healthcheck(_) => "healthcheck",
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    metrics: RwLock<HashMap<String, Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `metric` under `name`. Fails if the name is taken.
    pub fn register(&self, name: &str, metric: Metric) -> RegistryResult<()> {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if metrics.contains_key(name) {
            return Err(RegistryError::DuplicateMetric(name.to_string()));
        }
        debug!(%name, kind = metric.kind(), "metric registered");
        metrics.insert(name.to_string(), metric);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        metrics.get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.remove(name)
    }

    pub fn unregister_all(&self) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.clear();
    }

    pub fn len(&self) -> usize {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every registered metric. Iteration order is unspecified.
    ///
    /// The visitor runs on a copy of the map taken up front, so it may
    /// register or unregister metrics without deadlocking.
    pub fn each(&self, mut visit: impl FnMut(&str, &Metric)) {
        let entries: Vec<(String, Metric)> = {
            let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
            metrics
                .iter()
                .map(|(name, metric)| (name.clone(), metric.clone()))
                .collect()
        };
        for (name, metric) in &entries {
            visit(name, metric);
        }
    }

    /// Run every registered health check.
    pub fn run_healthchecks(&self) {
        self.each(|_, metric| {
            if let Metric::Healthcheck(h) = metric {
                h.check();
            }
        });
    }

    pub fn counter(&self, name: &str) -> RegistryResult<Arc<Counter>> {
        self.get_or_register(name, "counter", Metric::Counter, |m| match m {
            Metric::Counter(c) => Some(c.clone()),
            _ => None,
        })
    }

    pub fn gauge(&self, name: &str) -> RegistryResult<Arc<Gauge>> {
        self.get_or_register(name, "gauge", Metric::Gauge, |m| match m {
            Metric::Gauge(g) => Some(g.clone()),
            _ => None,
        })
    }

    pub fn gauge_float(&self, name: &str) -> RegistryResult<Arc<GaugeFloat>> {
        self.get_or_register(name, "gauge_float", Metric::GaugeFloat, |m| match m {
            Metric::GaugeFloat(g) => Some(g.clone()),
            _ => None,
        })
    }

    pub fn histogram(&self, name: &str) -> RegistryResult<Arc<Histogram>> {
        self.get_or_register(name, "histogram", Metric::Histogram, |m| match m {
            Metric::Histogram(h) => Some(h.clone()),
            _ => None,
        })
    }

    pub fn meter(&self, name: &str) -> RegistryResult<Arc<Meter>> {
        self.get_or_register(name, "meter", Metric::Meter, |m| match m {
            Metric::Meter(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn timer(&self, name: &str) -> RegistryResult<Arc<Timer>> {
        self.get_or_register(name, "timer", Metric::Timer, |m| match m {
            Metric::Timer(t) => Some(t.clone()),
            _ => None,
        })
    }

    /// Return the metric registered under `name`, creating a default one
    /// if absent. Fails if a metric of another kind owns the name.
    fn get_or_register<T: Default>(
        &self,
        name: &str,
        expected: &'static str,
        wrap: fn(Arc<T>) -> Metric,
        extract: fn(&Metric) -> Option<Arc<T>>,
    ) -> RegistryResult<Arc<T>> {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let metric = metrics
            .entry(name.to_string())
            .or_insert_with(|| wrap(Arc::new(T::default())));
        extract(metric).ok_or_else(|| RegistryError::KindMismatch {
            name: name.to_string(),
            expected,
            found: metric.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_get() {
        let registry = Registry::new();
        registry
            .register("req.count", Metric::Counter(Arc::new(Counter::new())))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("req.count").unwrap().kind(), "counter");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_register_fails() {
        let registry = Registry::new();
        registry
            .register("x", Metric::Gauge(Arc::new(Gauge::new())))
            .unwrap();
        let err = registry
            .register("x", Metric::Gauge(Arc::new(Gauge::new())))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMetric(name) if name == "x"));
    }

    #[test]
    fn typed_helpers_share_the_same_metric() {
        let registry = Registry::new();
        registry.counter("hits").unwrap().inc(2);
        registry.counter("hits").unwrap().inc(3);
        assert_eq!(registry.counter("hits").unwrap().count(), 5);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn typed_helper_kind_mismatch() {
        let registry = Registry::new();
        registry.gauge("mem.used").unwrap();
        let err = registry.timer("mem.used").unwrap_err();
        match err {
            RegistryError::KindMismatch { expected, found, .. } => {
                assert_eq!(expected, "timer");
                assert_eq!(found, "gauge");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn each_visits_everything_and_allows_reentry() {
        let registry = Registry::new();
        registry.counter("a").unwrap();
        registry.meter("b").unwrap();
        registry.histogram("c").unwrap();

        let mut seen = Vec::new();
        registry.each(|name, _| {
            seen.push(name.to_string());
            // Re-entering the registry from the visitor must not deadlock.
            registry.gauge_float("d").unwrap();
        });
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn unregister_removes() {
        let registry = Registry::new();
        registry.counter("a").unwrap();
        registry.counter("b").unwrap();
        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        registry.unregister_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn run_healthchecks_checks_each() {
        let registry = Registry::new();
        let hc = Arc::new(Healthcheck::new(|h| h.unhealthy("down")));
        registry
            .register("db", Metric::Healthcheck(hc.clone()))
            .unwrap();
        assert_eq!(hc.error(), None);
        registry.run_healthchecks();
        assert_eq!(hc.error().as_deref(), Some("down"));
    }
}
