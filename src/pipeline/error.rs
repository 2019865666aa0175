//! Error types for registration, configuration and module lifecycle.

use std::convert::Infallible;

use thiserror::Error;

/// Errors reported by the pipeline itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Stage value outside the five defined bands.
    #[error("invalid stage: {0}")]
    InvalidStage(String),

    /// A recognized option carried an unusable value.
    #[error("invalid value {value:?} for option {key}: {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },
}

impl From<Infallible> for PipelineError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Errors reported by modules from `start` and `stop`.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module {module}: invalid option {key}: {reason}")]
    InvalidOption {
        module: String,
        key: String,
        reason: String,
    },

    #[error("registration failed: {0}")]
    Registration(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("module {0} is not running")]
    NotRunning(String),
}

impl ModuleError {
    pub fn invalid_option(
        module: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ModuleError::InvalidOption {
            module: module.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}
