//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check module instances reference known kinds and valid stages
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check pipeline options the same way `Pipeline::configure` will
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::modules;
use crate::pipeline::{PipelineSettings, Stage};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("module at position {index} has an empty name")]
    EmptyModuleName { index: usize },

    #[error("module name {0:?} is used more than once")]
    DuplicateModule(String),

    #[error("module {name:?} has unknown kind {kind:?}")]
    UnknownKind { name: String, kind: String },

    #[error("module {name:?} has invalid stage {stage:?}")]
    InvalidStage { name: String, stage: String },

    #[error("pipeline: {0}")]
    Pipeline(String),
}

/// Check `config` and report every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_bytes" });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.request_timeout_secs" });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Err(e) = PipelineSettings::from_options(&config.pipeline) {
        errors.push(ValidationError::Pipeline(e.to_string()));
    }

    let mut seen = HashSet::new();
    for (index, module) in config.modules.iter().enumerate() {
        if module.name.trim().is_empty() {
            errors.push(ValidationError::EmptyModuleName { index });
        } else if !seen.insert(module.name.as_str()) {
            errors.push(ValidationError::DuplicateModule(module.name.clone()));
        }

        if !modules::KINDS.contains(&module.kind.as_str()) {
            errors.push(ValidationError::UnknownKind {
                name: module.name.clone(),
                kind: module.kind.clone(),
            });
        }

        if let Some(stage) = module.options.get("stage") {
            if stage.parse::<Stage>().is_err() {
                errors.push(ValidationError::InvalidStage {
                    name: module.name.clone(),
                    stage: stage.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ModuleConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
        assert!(validate_config(&ServerConfig::with_default_modules()).is_ok());
    }

    #[test]
    fn all_errors_are_reported() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.listener.request_timeout_secs = 0;
        config
            .pipeline
            .insert("response.status".into(), "abc".into());
        config.modules = vec![
            ModuleConfig::new("a", "echo").with_option("stage", "whenever"),
            ModuleConfig::new("a", "echo"),
            ModuleConfig::new("", "teleport"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: "not-an-address".into(),
        }));
        assert!(errors.contains(&ValidationError::Zero { field: "listener.request_timeout_secs" }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Pipeline(_))));
        assert!(errors.contains(&ValidationError::InvalidStage {
            name: "a".into(),
            stage: "whenever".into(),
        }));
        assert!(errors.contains(&ValidationError::DuplicateModule("a".into())));
        assert!(errors.contains(&ValidationError::EmptyModuleName { index: 2 }));
        assert!(errors.contains(&ValidationError::UnknownKind {
            name: String::new(),
            kind: "teleport".into(),
        }));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
