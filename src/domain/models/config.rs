use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Main configuration structure for deltamin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Reduction engine configuration
    #[serde(default)]
    pub reduction: ReductionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Granularity of the atomic units the input is split into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Raw bytes, no encoding requirement
    Byte,
    /// Unicode scalar values (input must be UTF-8)
    #[default]
    Char,
    /// Lines including their terminator
    Line,
    /// Alternating runs of whitespace and non-whitespace
    Token,
}

impl UnitKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Line => "line",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "byte" | "bytes" => Ok(Self::Byte),
            "char" | "chars" => Ok(Self::Char),
            "line" | "lines" => Ok(Self::Line),
            "token" | "tokens" => Ok(Self::Token),
            other => Err(format!(
                "unknown unit kind '{other}' (expected byte, char, line or token)"
            )),
        }
    }
}

/// Reduction engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReductionConfig {
    /// Unit the input is split into
    #[serde(default)]
    pub unit: UnitKind,

    /// Starting granularity, also the floor after a reduction (at least 2)
    #[serde(default = "default_min_granularity")]
    pub min_granularity: usize,

    /// Number of oracle trials allowed in flight at once (1 = sequential)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-call oracle timeout in milliseconds; a timed-out call counts as pass
    #[serde(default)]
    pub oracle_timeout_ms: Option<u64>,

    /// Remember verdicts for sequences already classified in this run
    #[serde(default = "default_cache_verdicts")]
    pub cache_verdicts: bool,
}

const fn default_min_granularity() -> usize {
    2
}

const fn default_max_workers() -> usize {
    1
}

const fn default_cache_verdicts() -> bool {
    true
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            unit: UnitKind::default(),
            min_granularity: default_min_granularity(),
            max_workers: default_max_workers(),
            oracle_timeout_ms: None,
            cache_verdicts: default_cache_verdicts(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for a daily-rotated JSON log file (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_kind_parsing() {
        assert_eq!("char".parse::<UnitKind>(), Ok(UnitKind::Char));
        assert_eq!("Bytes".parse::<UnitKind>(), Ok(UnitKind::Byte));
        assert_eq!("lines".parse::<UnitKind>(), Ok(UnitKind::Line));
        assert_eq!("token".parse::<UnitKind>(), Ok(UnitKind::Token));
        assert!("word".parse::<UnitKind>().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("reduction:\n  unit: line\n").unwrap();
        assert_eq!(config.reduction.unit, UnitKind::Line);
        assert_eq!(config.reduction.min_granularity, 2);
        assert_eq!(config.reduction.max_workers, 1);
        assert!(config.reduction.cache_verdicts);
        assert_eq!(config.logging.level, "warn");
    }
}
