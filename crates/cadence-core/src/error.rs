use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by [`crate::Deque`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DequeError {
    #[error("deque is empty")]
    Empty,

    #[error("index {index} out of range for deque of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("capacity {capacity} is smaller than the current length {len}")]
    CapacityBelowCount { capacity: usize, len: usize },
}

/// Failures while loading or validating a [`crate::WorkerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
