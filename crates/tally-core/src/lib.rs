pub mod config;
pub mod error;
pub mod types;

pub use config::{FilterConfig, FilterRule, SinkConfig, TallyConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
