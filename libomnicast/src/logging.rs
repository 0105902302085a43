//! Shared tracing setup for the Omnicast binaries
//!
//! Both CLIs log to stderr so stdout stays clean for piped output. The
//! format and minimum level come from `OMNICAST_LOG_FORMAT` and
//! `OMNICAST_LOG_LEVEL`, with flags able to override either.
//!
//! # Examples
//!
//! ```no_run
//! // Respect the environment, fall back to text/info.
//! libomnicast::logging::init_default();
//! ```

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text, no colors, suitable for piping
    Text,
    /// One JSON object per line, for monitoring pipelines
    Json,
    /// Colored multi-line output for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        write!(f, "{}", s)
    }
}

/// Resolved logging settings, ready to install
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Install the global subscriber
    ///
    /// Call once at startup. `RUST_LOG` wins over the configured level;
    /// `verbose` bumps the fallback to debug.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber is already installed.
    pub fn init(&self) {
        let fallback = if self.verbose {
            "debug"
        } else {
            self.level.as_str()
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

        match self.format {
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .pretty()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .init();
            }
            LogFormat::Text => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_level(true)
                    .init();
            }
        }
    }
}

/// Settings drawn from the environment, before any flag overrides
///
/// Reads `OMNICAST_LOG_FORMAT` and `OMNICAST_LOG_LEVEL`; unset or
/// unparseable values fall back to text/info.
pub fn config_from_env(verbose: bool) -> LoggingConfig {
    let format = std::env::var("OMNICAST_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);
    let level = std::env::var("OMNICAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    LoggingConfig::new(format, level, verbose)
}

/// Install logging from the environment with defaults
///
/// ```bash
/// export OMNICAST_LOG_FORMAT=json
/// export OMNICAST_LOG_LEVEL=debug
/// omni-post "Hello world" --platform facebook
/// ```
pub fn init_default() {
    config_from_env(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        let result = "syslog".parse::<LogFormat>();
        assert!(result.unwrap_err().contains("Invalid log format: 'syslog'"));
    }

    #[test]
    fn test_log_format_display_round_trip() {
        for format in [LogFormat::Text, LogFormat::Json, LogFormat::Pretty] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        std::env::remove_var("OMNICAST_LOG_FORMAT");
        std::env::remove_var("OMNICAST_LOG_LEVEL");

        let config = config_from_env(false);
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, "info");
        assert!(!config.verbose);
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        std::env::set_var("OMNICAST_LOG_FORMAT", "json");
        std::env::set_var("OMNICAST_LOG_LEVEL", "warn");

        let config = config_from_env(true);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "warn");
        assert!(config.verbose);

        std::env::remove_var("OMNICAST_LOG_FORMAT");
        std::env::remove_var("OMNICAST_LOG_LEVEL");
    }
}
