//! Worker configuration loading and validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Worker settings, loaded from `.cadence/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Instructions a single tick may consume before yielding
    #[serde(default = "default_instruction_budget")]
    pub instruction_budget: u64,

    /// Next recurring due time below this requests `ONCE`
    #[serde(default = "default_once_threshold_ms")]
    pub once_threshold_ms: u64,

    /// Next recurring due time below this requests `UPDATE10`; above, `UPDATE100`
    #[serde(default = "default_update10_threshold_ms")]
    pub update10_threshold_ms: u64,

    /// Events kept by the CLI's ring trace sink
    #[serde(default = "default_trace_capacity")]
    pub trace_capacity: usize,
}

fn default_instruction_budget() -> u64 {
    40_000
}
fn default_once_threshold_ms() -> u64 {
    167
}
fn default_update10_threshold_ms() -> u64 {
    1667
}
fn default_trace_capacity() -> usize {
    64
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            instruction_budget: default_instruction_budget(),
            once_threshold_ms: default_once_threshold_ms(),
            update10_threshold_ms: default_update10_threshold_ms(),
            trace_capacity: default_trace_capacity(),
        }
    }
}

impl WorkerConfig {
    pub fn with_budget(mut self, instruction_budget: u64) -> Self {
        self.instruction_budget = instruction_budget;
        self
    }

    pub fn once_threshold(&self) -> Duration {
        Duration::from_millis(self.once_threshold_ms)
    }

    pub fn update10_threshold(&self) -> Duration {
        Duration::from_millis(self.update10_threshold_ms)
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from project root (looks for .cadence/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = project_root.join(".cadence/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruction_budget == 0 {
            return Err(ConfigError::Invalid(
                "instruction_budget must be greater than zero".to_string(),
            ));
        }
        if self.once_threshold_ms >= self.update10_threshold_ms {
            return Err(ConfigError::Invalid(format!(
                "once_threshold_ms ({}) must be below update10_threshold_ms ({})",
                self.once_threshold_ms, self.update10_threshold_ms
            )));
        }
        Ok(())
    }
}
