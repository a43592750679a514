use crate::error::{Result, RetentionError};
use log::LevelFilter;
use regex::Regex;

pub const DEFAULT_RETENTION_DAYS: i32 = 365;

pub const DEFAULT_RETENTION_ENV: &str = "default_log_retention";
pub const LOGGER_LEVEL_ENV: &str = "logger_level";
pub const INCLUDE_PATTERN_ENV: &str = "include_pattern";
pub const EXCLUDE_PATTERN_ENV: &str = "exclude_pattern";
pub const DRY_RUN_ENV: &str = "dry_run";

/// Process-wide settings, built once at startup and borrowed by every invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub default_retention_days: i32,
    pub include_pattern: Option<Regex>,
    pub exclude_pattern: Option<Regex>,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_retention_days: DEFAULT_RETENTION_DAYS,
            include_pattern: None,
            exclude_pattern: None,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn new(default_retention_days: i32) -> Result<Self> {
        if default_retention_days < 1 {
            return Err(RetentionError::Configuration(format!(
                "default retention must be a positive number of days, got {default_retention_days}"
            )));
        }

        Ok(Self {
            default_retention_days,
            ..Self::default()
        })
    }

    pub fn with_include_pattern(mut self, pattern: Option<&str>) -> Result<Self> {
        self.include_pattern = pattern.map(|p| compile_pattern("include", p)).transpose()?;
        Ok(self)
    }

    pub fn with_exclude_pattern(mut self, pattern: Option<&str>) -> Result<Self> {
        self.exclude_pattern = pattern.map(|p| compile_pattern("exclude", p)).transpose()?;
        Ok(self)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset or blank keys fall back to defaults.
    /// Numeric and boolean values are trimmed, patterns are used verbatim.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_retention_days = match value(DEFAULT_RETENTION_ENV) {
            Some(raw) => raw.trim().parse::<i32>().map_err(|e| {
                RetentionError::Configuration(format!(
                    "{DEFAULT_RETENTION_ENV}={raw:?} is not an integer: {e}"
                ))
            })?,
            None => DEFAULT_RETENTION_DAYS,
        };

        let dry_run = match value(DRY_RUN_ENV) {
            Some(raw) => parse_bool(DRY_RUN_ENV, raw.trim())?,
            None => false,
        };

        Ok(Self::new(default_retention_days)?
            .with_include_pattern(value(INCLUDE_PATTERN_ENV).as_deref())?
            .with_exclude_pattern(value(EXCLUDE_PATTERN_ENV).as_deref())?
            .with_dry_run(dry_run))
    }

    /// Whether a log group falls under this config's include/exclude filters.
    pub fn is_managed(&self, log_group_name: &str) -> bool {
        let include_match = self
            .include_pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(log_group_name));

        let exclude_match = self
            .exclude_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(log_group_name));

        include_match && !exclude_match
    }
}

fn compile_pattern(kind: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        RetentionError::Configuration(format!("Invalid {kind} pattern {pattern:?}: {e}"))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RetentionError::Configuration(format!(
            "{key}={raw:?} is not a boolean"
        ))),
    }
}

/// Resolves the `logger_level` setting, falling back to `default` when unset.
pub fn log_level_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
    default: LevelFilter,
) -> Result<LevelFilter> {
    match lookup(LOGGER_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
        Some(raw) => {
            let raw = raw.trim();
            // Python-style level names used by existing deployments
            let normalized = match raw.to_ascii_uppercase().as_str() {
                "WARNING" => "WARN".to_string(),
                "CRITICAL" | "FATAL" => "ERROR".to_string(),
                "NOTSET" => "TRACE".to_string(),
                other => other.to_string(),
            };

            normalized.parse::<LevelFilter>().map_err(|_| {
                RetentionError::Configuration(format!(
                    "{LOGGER_LEVEL_ENV}={raw:?} is not a log level"
                ))
            })
        }
        None => Ok(default),
    }
}
