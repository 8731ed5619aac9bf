use std::{fmt, str::FromStr};

use log::LevelFilter;
use semtour_derive::{KvDisplay, WithMethods};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, codec::DEFAULT_CODEC_BASE};

pub const DEFAULT_DISTANCE_SCALE: f64 = 10_000.0;
pub const DEFAULT_ALIGNMENT_PENALTY: i64 = 20_000;
pub const DEFAULT_PROFILE: &str = "semantic";

/// Runtime options for one pipeline runner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, KvDisplay, WithMethods)]
#[serde(default)]
pub struct PipelineOptions {
    /// Base of the index <-> location codec. Widened automatically when the
    /// item count does not fit in `base * base`.
    pub codec_base: u32,
    /// Multiplier applied to clamped cosine distances before rounding.
    pub distance_scale: f64,
    /// Cost used for matrix cells whose location has no embedding.
    pub alignment_penalty: i64,
    /// Wall-clock budget handed to the optimizer, in seconds.
    pub max_time_secs: f64,
    /// Iteration budget handed to the optimizer.
    pub max_generations: usize,
    /// Routing profile shared by the vehicle and the matrix.
    pub profile: String,
    #[kv(skip)]
    pub logging: LoggingOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            codec_base: DEFAULT_CODEC_BASE,
            distance_scale: DEFAULT_DISTANCE_SCALE,
            alignment_penalty: DEFAULT_ALIGNMENT_PENALTY,
            max_time_secs: 5.0,
            max_generations: 3_000,
            profile: DEFAULT_PROFILE.to_string(),
            logging: LoggingOptions::default(),
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<()> {
        if self.codec_base < 2 {
            return Err(Error::invalid_input("codec_base must be >= 2"));
        }
        if !(self.distance_scale.is_finite() && self.distance_scale > 0.0) {
            return Err(Error::invalid_input("distance_scale must be > 0"));
        }
        if self.alignment_penalty < 0 {
            return Err(Error::invalid_input("alignment_penalty must be >= 0"));
        }
        if !(self.max_time_secs.is_finite() && self.max_time_secs > 0.0) {
            return Err(Error::invalid_input("max_time_secs must be > 0"));
        }
        if self.max_generations == 0 {
            return Err(Error::invalid_input("max_generations must be > 0"));
        }
        if self.profile.trim().is_empty() {
            return Err(Error::invalid_input("profile must not be empty"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, KvDisplay, WithMethods)]
#[serde(default)]
pub struct LoggingOptions {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    /// Prefix each line with a millisecond timestamp.
    pub log_timestamp: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_timestamp: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "off" => Ok(Self::Off),
            other => Err(Error::invalid_input(format!(
                "unknown log level '{other}'; expected error/warn/info/debug/trace/off"
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            other => Err(Error::invalid_input(format!(
                "unknown log format '{other}'; expected compact/pretty"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => f.write_str("compact"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, LogLevel, PipelineOptions};

    #[test]
    fn defaults_pass_validation() {
        PipelineOptions::default()
            .validate()
            .expect("defaults should be valid");
    }

    #[test]
    fn validate_rejects_a_base_that_cannot_encode() {
        let err = PipelineOptions::default()
            .with_codec_base(1u32)
            .validate()
            .expect_err("base 1 should fail");
        assert!(err.to_string().contains("codec_base"));
    }

    #[test]
    fn validate_rejects_non_positive_budgets() {
        assert!(
            PipelineOptions::default()
                .with_max_time_secs(0.0)
                .validate()
                .is_err()
        );
        assert!(
            PipelineOptions::default()
                .with_max_generations(0usize)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn display_lists_every_visible_option() {
        let text = PipelineOptions::default().to_string();
        assert!(text.contains("codec_base"));
        assert!(text.contains("= 1000"));
        assert!(text.contains("profile"));
        assert!(!text.contains("logging"));
    }

    #[test]
    fn log_level_parses_aliases_and_rejects_unknown_values() {
        assert_eq!("WARNING".parse::<LogLevel>().expect("alias"), LogLevel::Warn);
        assert_eq!(" debug ".parse::<LogLevel>().expect("trimmed"), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_format_round_trips_through_display() {
        for format in [LogFormat::Compact, LogFormat::Pretty] {
            assert_eq!(
                format.to_string().parse::<LogFormat>().expect("parse"),
                format
            );
        }
    }

    #[test]
    fn options_deserialize_with_defaults_for_missing_fields() {
        let options: PipelineOptions =
            serde_json::from_str(r#"{"max_time_secs": 1.5, "logging": {"log_level": "info"}}"#)
                .expect("deserialize options");
        assert_eq!(options.max_time_secs, 1.5);
        assert_eq!(options.codec_base, 1000);
        assert_eq!(options.logging.log_level, LogLevel::Info);
        assert_eq!(options.logging.log_format, LogFormat::Compact);
    }
}
