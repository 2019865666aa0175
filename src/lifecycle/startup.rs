//! Startup orchestration.
//!
//! # Responsibilities
//! - Configure the pipeline from the `[pipeline]` section
//! - Load every `[[modules]]` entry in file order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Modules already started are unloaded again before the error is returned

use std::sync::Arc;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::lifecycle::host::{HostError, ModuleHost};
use crate::modules;
use crate::pipeline::{Module, Pipeline, PipelineError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("pipeline configuration rejected: {0}")]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Build a configured pipeline with all modules from `config` loaded.
pub fn build_pipeline(config: &ServerConfig) -> Result<ModuleHost, StartupError> {
    build_pipeline_with(config, modules::build)
}

/// Like [`build_pipeline`], with module instances created by `factory`
/// from their configured kind.
pub fn build_pipeline_with<F>(config: &ServerConfig, factory: F) -> Result<ModuleHost, StartupError>
where
    F: Fn(&str) -> Option<Arc<dyn Module>>,
{
    let pipeline = Arc::new(Pipeline::new());
    pipeline.configure(&config.pipeline)?;

    let host = ModuleHost::new(pipeline);
    for module in &config.modules {
        let loaded = match factory(&module.kind) {
            Some(instance) => host.load(&module.name, instance, &module.options),
            None => Err(HostError::UnknownKind {
                name: module.name.clone(),
                kind: module.kind.clone(),
            }),
        };
        if let Err(e) = loaded {
            tracing::error!(instance = %module.name, kind = %module.kind, error = %e, "Startup aborted");
            let stopped = host.shutdown();
            tracing::info!(stopped, "Rolled back started modules");
            return Err(e.into());
        }
    }

    tracing::info!(
        modules = host.loaded().len(),
        entries = host.pipeline().module_count(),
        "Pipeline ready"
    );
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::http::Request;
    use crate::modules::EchoModule;
    use crate::pipeline::{ModuleError, Stage};
    use std::sync::Mutex;

    #[test]
    fn default_modules_serve_requests() {
        let host = build_pipeline(&ServerConfig::with_default_modules()).unwrap();
        let pipeline = host.pipeline();
        assert_eq!(pipeline.stage_len(Stage::ReallyFirst), 1);
        assert_eq!(pipeline.stage_len(Stage::First), 1);
        assert_eq!(pipeline.stage_len(Stage::ReallyLast), 1);

        let res = pipeline.handle_request(&Request::new("GET", "/", "HTTP/1.1"));
        assert_eq!(res.status, 200);
        assert!(res.header("X-Request-Id").is_some());
    }

    #[test]
    fn pipeline_options_are_applied() {
        let mut config = ServerConfig::default();
        config.pipeline.insert("response.reason".into(), "Empty".into());
        let host = build_pipeline(&config).unwrap();

        let res = host.pipeline().handle_request(&Request::new("GET", "/", "HTTP/1.1"));
        assert_eq!(res.status, 501);
        assert_eq!(res.reason, "Empty");
    }

    #[test]
    fn failure_stops_started_modules() {
        let mut config = ServerConfig::default();
        config.modules = vec![
            ModuleConfig::new("ok", "echo"),
            ModuleConfig::new("bad", "echo").with_option("stage", "nope"),
        ];

        let created: Mutex<Vec<Arc<EchoModule>>> = Mutex::new(Vec::new());
        let result = build_pipeline_with(&config, |_| {
            let echo = Arc::new(EchoModule::new());
            created.lock().unwrap().push(echo.clone());
            Some(echo as Arc<dyn Module>)
        });
        assert!(matches!(result, Err(StartupError::Host(HostError::Module { .. }))));

        let created = created.into_inner().unwrap();
        assert_eq!(created.len(), 2);
        // Already stopped by the rollback, so a second stop is refused.
        assert!(matches!(created[0].stop(), Err(ModuleError::NotRunning(_))));
    }

    #[test]
    fn unknown_kind_from_factory() {
        let mut config = ServerConfig::default();
        config.modules.push(ModuleConfig::new("x", "teleport"));
        assert!(matches!(
            build_pipeline_with(&config, modules::build),
            Err(StartupError::Host(HostError::UnknownKind { .. }))
        ));
    }

    #[test]
    fn invalid_pipeline_options_fail() {
        let mut config = ServerConfig::default();
        config.pipeline.insert("response.status".into(), "0".into());
        assert!(matches!(build_pipeline(&config), Err(StartupError::Pipeline(_))));
    }
}
