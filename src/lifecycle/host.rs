//! Module host: loads and unloads named module instances.
//!
//! # Responsibilities
//! - Start modules against the pipeline and remember them by name
//! - On unload, stop the module and only then unhook it
//! - Stop everything on shutdown, even if some modules fail to stop
//!
//! # Design Decisions
//! - Instance names are unique per host
//! - A module whose `stop` fails stays loaded and hooked

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::modules;
use crate::pipeline::{Module, ModuleError, Options, Pipeline};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("module instance {0:?} is already loaded")]
    Duplicate(String),

    #[error("module instance {0:?} is not loaded")]
    Unknown(String),

    #[error("module instance {name:?} has unknown kind {kind:?}")]
    UnknownKind { name: String, kind: String },

    #[error("module instance {name:?}: {source}")]
    Module {
        name: String,
        #[source]
        source: ModuleError,
    },
}

/// Owner of the loaded modules of one pipeline.
pub struct ModuleHost {
    pipeline: Arc<Pipeline>,
    loaded: DashMap<String, Arc<dyn Module>>,
}

impl ModuleHost {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            loaded: DashMap::new(),
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Start `module` and remember it as `name`.
    ///
    /// `start` runs without any host lock held, so it may call back into
    /// the host. If another load claimed `name` in the meantime, the module
    /// is stopped and its new hook entries are removed.
    pub fn load(&self, name: &str, module: Arc<dyn Module>, options: &Options) -> Result<(), HostError> {
        if self.loaded.contains_key(name) {
            return Err(HostError::Duplicate(name.to_string()));
        }

        let before = self.pipeline.hook_counts(&module);
        self.pipeline
            .start_module(Arc::clone(&module), options)
            .map_err(|source| HostError::Module {
                name: name.to_string(),
                source,
            })?;

        let inserted = match self.loaded.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&module));
                true
            }
        };
        if !inserted {
            if let Err(e) = module.stop() {
                tracing::warn!(instance = %name, error = %e, "Failed to stop module after losing name race");
            }
            self.pipeline.trim_hooks(&module, before);
            return Err(HostError::Duplicate(name.to_string()));
        }

        tracing::info!(instance = %name, module = module.name(), "Module loaded");
        Ok(())
    }

    /// Build a module of `kind` and load it as `name`.
    pub fn load_kind(&self, name: &str, kind: &str, options: &Options) -> Result<(), HostError> {
        let module = modules::build(kind).ok_or_else(|| HostError::UnknownKind {
            name: name.to_string(),
            kind: kind.to_string(),
        })?;
        self.load(name, module, options)
    }

    /// Stop the module loaded as `name`, then unhook and forget it.
    pub fn unload(&self, name: &str) -> Result<(), HostError> {
        let module = self
            .loaded
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| HostError::Unknown(name.to_string()))?;

        module.stop().map_err(|source| HostError::Module {
            name: name.to_string(),
            source,
        })?;

        self.pipeline.unhook(&module);
        self.loaded.remove(name);
        tracing::info!(instance = %name, module = module.name(), "Module unloaded");
        Ok(())
    }

    /// Unload every module. Returns how many were unloaded.
    pub fn shutdown(&self) -> usize {
        let mut unloaded = 0;
        for name in self.loaded() {
            match self.unload(&name) {
                Ok(()) => unloaded += 1,
                Err(e) => tracing::error!(instance = %name, error = %e, "Module failed to stop"),
            }
        }
        unloaded
    }

    /// Names of the loaded instances, sorted.
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.loaded.get(name).map(|entry| Arc::clone(entry.value()))
    }
}
