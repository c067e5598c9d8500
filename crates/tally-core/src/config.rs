//! tally.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Dimensions, MAX_BATCH_SIZE};

/// Percentiles computed for histograms and timers when no rule says otherwise.
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

/// Longest accepted reporting interval (one week).
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Backend namespace every batch is submitted under.
    pub namespace: String,
    /// Reporting interval, e.g. "60s", "500ms", "2m".
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Clear counters after their value has been reported.
    #[serde(default)]
    pub reset_counters: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Run one last cycle when the reporter is asked to stop.
    #[serde(default = "default_true")]
    pub flush_on_shutdown: bool,
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_percentiles")]
    pub default_percentiles: Vec<f64>,
    /// Evaluated in order; the first matching rule decides.
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_percentiles: default_percentiles(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    /// Regular expression matched against the metric name.
    pub pattern: String,
    pub report: Option<bool>,
    pub percentiles: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Write batches to the log.
    #[default]
    Log,
    /// POST batches as JSON to `endpoint` (host:port).
    Http {
        endpoint: String,
        #[serde(default = "default_path")]
        path: String,
        #[serde(default = "default_timeout")]
        timeout: String,
    },
}

impl SinkConfig {
    /// Request timeout for the http sink; `None` for sinks without one.
    pub fn timeout(&self) -> ConfigResult<Option<Duration>> {
        match self {
            SinkConfig::Log => Ok(None),
            SinkConfig::Http { timeout, .. } => parse_duration(timeout)
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidDuration {
                    field: "sink.timeout",
                    value: timeout.clone(),
                }),
        }
    }
}

fn default_interval() -> String {
    "60s".to_string()
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

fn default_percentiles() -> Vec<f64> {
    DEFAULT_PERCENTILES.to_vec()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_timeout() -> String {
    "5s".to_string()
}

impl TallyConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TallyConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A config that logs every metric once a minute under `namespace`.
    pub fn with_namespace(namespace: &str) -> Self {
        TallyConfig {
            namespace: namespace.to_string(),
            interval: default_interval(),
            reset_counters: false,
            debug: false,
            max_batch_size: MAX_BATCH_SIZE,
            flush_on_shutdown: true,
            dimensions: HashMap::new(),
            filter: FilterConfig::default(),
            sink: SinkConfig::Log,
        }
    }

    pub fn interval(&self) -> ConfigResult<Duration> {
        let interval = parse_duration(&self.interval).ok_or_else(|| ConfigError::InvalidDuration {
            field: "interval",
            value: self.interval.clone(),
        })?;
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if interval > MAX_INTERVAL {
            return Err(ConfigError::IntervalTooLong {
                value: self.interval.clone(),
                max: MAX_INTERVAL,
            });
        }
        Ok(interval)
    }

    /// The static dimension set, built once and shared by every data point.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from(&self.dimensions)
    }

    /// Check everything the reporter relies on before it starts.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        self.interval()?;
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                value: self.max_batch_size,
                max: MAX_BATCH_SIZE,
            });
        }

        validate_percentiles(&self.filter.default_percentiles)?;
        for rule in &self.filter.rules {
            regex::Regex::new(&rule.pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: rule.pattern.clone(),
                reason: e.to_string(),
            })?;
            if let Some(ref percentiles) = rule.percentiles {
                validate_percentiles(percentiles)?;
            }
        }

        if let SinkConfig::Http { ref endpoint, .. } = self.sink {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::MissingEndpoint);
            }
        }
        self.sink.timeout()?;
        Ok(())
    }
}

/// Reject percentiles outside [0, 1] (NaN included).
pub fn validate_percentiles(percentiles: &[f64]) -> ConfigResult<()> {
    match percentiles.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        Some(p) => Err(ConfigError::InvalidPercentile(*p)),
        None => Ok(()),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
namespace = "myapp/prod"
interval = "30s"
reset_counters = true
debug = true
max_batch_size = 10

[dimensions]
env = "prod"
region = "eu-west-1"

[filter]
default_percentiles = [0.5, 0.99]

[[filter.rules]]
pattern = "^internal\\."
report = false

[[filter.rules]]
pattern = "^http\\."
percentiles = [0.9]

[sink]
type = "http"
endpoint = "127.0.0.1:9000"
path = "/v1/metrics"
"#;

    #[test]
    fn test_parse_minimal() {
        let config: TallyConfig = toml::from_str(r#"namespace = "app""#).unwrap();
        assert_eq!(config.namespace, "app");
        assert_eq!(config.interval().unwrap(), Duration::from_secs(60));
        assert!(!config.reset_counters);
        assert!(config.flush_on_shutdown);
        assert_eq!(config.max_batch_size, MAX_BATCH_SIZE);
        assert_eq!(config.filter.default_percentiles, DEFAULT_PERCENTILES.to_vec());
        assert!(matches!(config.sink, SinkConfig::Log));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full() {
        let config: TallyConfig = toml::from_str(FULL).unwrap();
        assert_eq!(config.interval().unwrap(), Duration::from_secs(30));
        assert!(config.reset_counters);
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.filter.rules.len(), 2);
        assert_eq!(config.filter.rules[0].report, Some(false));
        assert_eq!(config.filter.rules[1].percentiles, Some(vec![0.9]));
        match &config.sink {
            SinkConfig::Http { endpoint, path, timeout } => {
                assert_eq!(endpoint, "127.0.0.1:9000");
                assert_eq!(path, "/v1/metrics");
                assert_eq!(timeout, "5s");
            }
            other => panic!("unexpected sink: {other:?}"),
        }
        assert_eq!(config.sink.timeout().unwrap(), Some(Duration::from_secs(5)));

        let dims = config.dimensions();
        assert_eq!(dims.as_slice()[0].name, "env");
        assert_eq!(dims.as_slice()[1].name, "region");
        config.validate().unwrap();
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config: TallyConfig = toml::from_str(FULL).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed: TallyConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.namespace, "myapp/prod");
        assert_eq!(reparsed.filter.rules.len(), 2);
    }

    #[test]
    fn validate_rejects_empty_namespace() {
        let config = TallyConfig::with_namespace("  ");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyNamespace)));
    }

    #[test]
    fn validate_rejects_bad_interval() {
        let mut config = TallyConfig::with_namespace("app");
        config.interval = "soon".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { field: "interval", .. })
        ));

        config.interval = "0s".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn validate_rejects_batch_size_out_of_range() {
        let mut config = TallyConfig::with_namespace("app");
        config.max_batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBatchSize { .. })));
        config.max_batch_size = MAX_BATCH_SIZE + 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBatchSize { .. })));
    }

    #[test]
    fn validate_rejects_bad_percentiles_and_patterns() {
        let mut config = TallyConfig::with_namespace("app");
        config.filter.default_percentiles = vec![0.5, 1.5];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPercentile(p)) if p == 1.5));

        let mut config = TallyConfig::with_namespace("app");
        config.filter.rules.push(FilterRule {
            pattern: "(unclosed".to_string(),
            report: None,
            percentiles: None,
        });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn validate_rejects_http_sink_without_endpoint() {
        let mut config = TallyConfig::with_namespace("app");
        config.sink = SinkConfig::Http {
            endpoint: String::new(),
            path: default_path(),
            timeout: default_timeout(),
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_duration_milliseconds() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_minutes() {
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_duration_plain_number_as_seconds() {
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("ten"), None);
    }

    #[test]
    fn parse_duration_minutes_overflow() {
        assert_eq!(parse_duration("999999999999999999m"), None);
        assert_eq!(
            parse_duration("307445734561825860m"),
            Some(Duration::from_secs(307445734561825860 * 60))
        );
    }

    #[test]
    fn validate_rejects_unparseable_minutes() {
        let mut config = TallyConfig::with_namespace("app");
        config.interval = "999999999999999999m".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration { field: "interval", .. })
        ));
    }

    #[test]
    fn validate_rejects_interval_beyond_max() {
        let mut config = TallyConfig::with_namespace("app");
        config.interval = "18446744073709551615s".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IntervalTooLong { .. })
        ));

        config.interval = "7d".to_string();
        assert!(config.validate().is_err());
        config.interval = format!("{}s", MAX_INTERVAL.as_secs());
        assert_eq!(config.interval().unwrap(), MAX_INTERVAL);
        config.interval = format!("{}s", MAX_INTERVAL.as_secs() + 1);
        assert!(matches!(
            config.interval(),
            Err(ConfigError::IntervalTooLong { .. })
        ));
    }
}
