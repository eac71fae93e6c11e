// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmark configuration.

use crate::error::ConfigError;
use crate::scenario::ScenarioKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use streambench_core::Dur;

/// Parameters of one benchmark run.
///
/// Missing JSON fields take their [`Default`] values, so a config file only
/// needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Scenario to run
    pub scenario: ScenarioKind,
    /// Elements per instance
    pub size: usize,
    /// Parallel instances, one worker each
    pub threads: usize,
    /// Time between consecutive input elements
    pub period: Dur,
    /// Window length; the scenario default when unset
    pub window: Option<Dur>,
    /// Elements per compressed block
    pub block_size: usize,
    /// Generator seed; instance `i` uses `seed + i`
    pub seed: u64,
    /// Dump every region to `dump_dir` before it is released
    pub enable_debug_dump: bool,
    /// Directory receiving debug dumps
    pub dump_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::Select,
            size: 100_000_000,
            threads: 1,
            period: 1,
            window: None,
            block_size: 64,
            seed: 42,
            enable_debug_dump: false,
            dump_dir: PathBuf::from("."),
        }
    }
}

impl BenchConfig {
    /// Default configuration for `scenario`
    #[must_use]
    pub fn for_scenario(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            ..Self::default()
        }
    }

    /// Parse a JSON config
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Json`] when it does not parse.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Effective window length
    #[must_use]
    pub fn window(&self) -> Dur {
        self.window
            .unwrap_or_else(|| self.scenario.default_window(self.period))
    }

    /// End of the queried time range `[0, period * size)`
    #[must_use]
    pub fn end_time(&self) -> Dur {
        self.period.saturating_mul(self.size as Dur)
    }

    /// Check every parameter before any region is allocated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.size == 0 {
            return invalid("size must be positive".to_string());
        }
        if self.threads == 0 {
            return invalid("threads must be positive".to_string());
        }
        if self.period <= 0 {
            return invalid(format!("period must be positive, got {}", self.period));
        }
        let window = self.window();
        if window <= 0 {
            return invalid(format!("window must be positive, got {window}"));
        }
        if self.block_size == 0 {
            return invalid("block size must be positive".to_string());
        }
        if self.period.checked_mul(self.size as Dur).is_none() {
            return invalid(format!(
                "time range of {} elements every {} overflows",
                self.size, self.period
            ));
        }
        if self.scenario.is_two_stream() && self.period > window {
            return invalid(format!(
                "{} needs period <= window, got period {} and window {window}",
                self.scenario, self.period
            ));
        }
        if self.scenario.is_compressed() {
            let span = (self.block_size as Dur).saturating_mul(self.period);
            if u32::try_from(span).is_err() {
                return invalid(format!(
                    "block span {span} does not fit 32-bit delta timestamps"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.scenario, ScenarioKind::Select);
        assert_eq!(config.size, 100_000_000);
        assert_eq!(config.threads, 1);
        assert_eq!(config.window(), 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config =
            BenchConfig::from_json_str(r#"{"scenario": "bdoptsum", "size": 4096, "period": 2}"#)
                .unwrap();
        assert_eq!(config.scenario, ScenarioKind::BdOptSum);
        assert_eq!(config.size, 4096);
        assert_eq!(config.window(), 2000);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.end_time(), 8192);
    }

    #[test]
    fn test_rejects_unknown_fields_and_scenarios() {
        assert!(matches!(
            BenchConfig::from_json_str(r#"{"sise": 10}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(BenchConfig::from_json_str(r#"{"scenario": "nope"}"#).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = BenchConfig::for_scenario(ScenarioKind::BdSelect);
        config.size = 1000;
        config.period = 10;
        config.window = Some(5);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.window = Some(10);
        assert!(config.validate().is_ok());

        let zero = BenchConfig {
            threads: 0,
            ..BenchConfig::default()
        };
        assert!(zero.validate().is_err());

        let wide = BenchConfig {
            scenario: ScenarioKind::BdOptSelect,
            block_size: 1 << 20,
            period: 1 << 13,
            ..BenchConfig::default()
        };
        assert!(wide.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"scenario": "where8", "threads": 3, "seed": 7}}"#).unwrap();
        let config = BenchConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.scenario, ScenarioKind::Where8);
        assert_eq!(config.threads, 3);
        assert_eq!(config.seed, 7);

        let missing = BenchConfig::from_json_file(Path::new("/nonexistent/streambench.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
