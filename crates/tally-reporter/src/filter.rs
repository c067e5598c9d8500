//! Per-metric reporting policy.

use regex::Regex;

use tally_core::config::{validate_percentiles, DEFAULT_PERCENTILES};
use tally_core::{ConfigError, ConfigResult, FilterConfig};

/// Decides whether a metric is exported and which percentiles to compute
/// for histograms and timers.
///
/// Implementations must be pure functions of the name: the same name always
/// yields the same answer, and neither method may fail.
pub trait FilterPolicy: Send + Sync {
    fn should_report(&self, name: &str) -> bool;

    /// Percentiles in `[0, 1]`, in the order their data points are emitted.
    fn percentiles(&self, name: &str) -> &[f64];
}

/// Reports everything with the default percentile set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl FilterPolicy for AllowAll {
    fn should_report(&self, _name: &str) -> bool {
        true
    }

    fn percentiles(&self, _name: &str) -> &[f64] {
        &DEFAULT_PERCENTILES
    }
}

#[derive(Debug)]
struct CompiledRule {
    pattern: Regex,
    report: Option<bool>,
    percentiles: Option<Vec<f64>>,
}

/// Ordered regex rules; the first rule matching a name decides, and fields
/// the rule leaves unset fall back to the defaults.
#[derive(Debug)]
pub struct RuleFilter {
    default_percentiles: Vec<f64>,
    rules: Vec<CompiledRule>,
}

impl RuleFilter {
    pub fn from_config(config: &FilterConfig) -> ConfigResult<Self> {
        validate_percentiles(&config.default_percentiles)?;

        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let pattern = Regex::new(&rule.pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: rule.pattern.clone(),
                reason: e.to_string(),
            })?;
            if let Some(ref percentiles) = rule.percentiles {
                validate_percentiles(percentiles)?;
            }
            rules.push(CompiledRule {
                pattern,
                report: rule.report,
                percentiles: rule.percentiles.clone(),
            });
        }

        Ok(Self {
            default_percentiles: config.default_percentiles.clone(),
            rules,
        })
    }

    fn matching_rule(&self, name: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|r| r.pattern.is_match(name))
    }
}

impl FilterPolicy for RuleFilter {
    fn should_report(&self, name: &str) -> bool {
        self.matching_rule(name)
            .and_then(|r| r.report)
            .unwrap_or(true)
    }

    fn percentiles(&self, name: &str) -> &[f64] {
        self.matching_rule(name)
            .and_then(|r| r.percentiles.as_deref())
            .unwrap_or(self.default_percentiles.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::FilterRule;

    fn rule(pattern: &str, report: Option<bool>, percentiles: Option<Vec<f64>>) -> FilterRule {
        FilterRule {
            pattern: pattern.to_string(),
            report,
            percentiles,
        }
    }

    fn test_filter() -> RuleFilter {
        RuleFilter::from_config(&FilterConfig {
            default_percentiles: vec![0.5, 0.99],
            rules: vec![
                rule(r"^internal\.", Some(false), None),
                rule(r"^http\.", None, Some(vec![0.9, 0.999])),
                rule(r"^http\.debug", Some(false), None),
            ],
        })
        .unwrap()
    }

    #[test]
    fn defaults_apply_without_match() {
        let f = test_filter();
        assert!(f.should_report("db.query"));
        assert_eq!(f.percentiles("db.query"), &[0.5, 0.99]);
    }

    #[test]
    fn rule_disables_reporting() {
        let f = test_filter();
        assert!(!f.should_report("internal.gc"));
        // Unset percentiles fall back to the defaults.
        assert_eq!(f.percentiles("internal.gc"), &[0.5, 0.99]);
    }

    #[test]
    fn rule_overrides_percentiles_in_order() {
        let f = test_filter();
        assert!(f.should_report("http.latency"));
        assert_eq!(f.percentiles("http.latency"), &[0.9, 0.999]);
    }

    #[test]
    fn first_matching_rule_wins() {
        let f = test_filter();
        // `^http\.` matches first and leaves `report` unset.
        assert!(f.should_report("http.debug.hits"));
    }

    #[test]
    fn answers_are_idempotent() {
        let f = test_filter();
        for name in ["db.query", "internal.gc", "http.latency", ""] {
            assert_eq!(f.should_report(name), f.should_report(name));
            assert_eq!(f.percentiles(name), f.percentiles(name));
        }
    }

    #[test]
    fn allow_all_reports_everything() {
        assert!(AllowAll.should_report("anything"));
        assert_eq!(AllowAll.percentiles("anything"), &DEFAULT_PERCENTILES);
    }

    #[test]
    fn invalid_pattern_rejected() {
        let err = RuleFilter::from_config(&FilterConfig {
            default_percentiles: vec![0.5],
            rules: vec![rule("[", Some(false), None)],
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn invalid_percentile_rejected() {
        let err = RuleFilter::from_config(&FilterConfig {
            default_percentiles: vec![0.5],
            rules: vec![rule("x", None, Some(vec![-0.1]))],
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPercentile(_)));
    }
}
