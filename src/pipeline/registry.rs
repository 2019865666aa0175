//! Module registry and staged dispatch.
//!
//! # Responsibilities
//! - Keep one ordered module list per stage
//! - Validate stages at hook time so dispatch never sees a bad one
//! - Build the default response and walk the stages for every request
//!
//! # Design Decisions
//! - Registry is a fixed `[Vec; 5]` indexed by stage ordinal
//! - Registry and settings sit behind `ArcSwap`: dispatch takes a
//!   snapshot with one atomic load, hook/unhook publish a new copy
//! - A hook or unhook during a dispatch affects the next dispatch only

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::pipeline::error::{ModuleError, PipelineError};
use crate::pipeline::module::{Flow, Module};
use crate::pipeline::settings::PipelineSettings;
use crate::pipeline::stage::Stage;
use crate::pipeline::Options;

type Modules = Vec<Arc<dyn Module>>;

#[derive(Clone, Default)]
struct Registry {
    stages: [Modules; Stage::COUNT],
}

impl Registry {
    fn modules(&self, stage: Stage) -> &[Arc<dyn Module>] {
        &self.stages[stage.index()]
    }

    fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }
}

fn module_addr<M: Module + ?Sized>(module: &Arc<M>) -> *const () {
    Arc::as_ptr(module).cast::<()>()
}

/// The request pipeline: module registry plus dispatcher.
pub struct Pipeline {
    registry: ArcSwap<Registry>,
    settings: ArcSwap<PipelineSettings>,
}

impl Pipeline {
    /// Create an empty pipeline with default settings.
    pub fn new() -> Self {
        Self {
            registry: ArcSwap::from_pointee(Registry::default()),
            settings: ArcSwap::from_pointee(PipelineSettings::default()),
        }
    }

    /// Apply pipeline options. See [`crate::pipeline::settings`] for keys.
    ///
    /// Settings are rebuilt from the defaults on every call. On error the
    /// previous settings stay in place.
    pub fn configure(&self, options: &Options) -> Result<(), PipelineError> {
        let settings = PipelineSettings::from_options(options)?;
        tracing::debug!(
            version = %settings.version,
            status = settings.status,
            headers = settings.headers.len(),
            "Pipeline configured"
        );
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<PipelineSettings> {
        self.settings.load_full()
    }

    /// Append `module` to the sequence of `stage`.
    ///
    /// Hooking the same module twice adds a second entry, so it runs twice.
    pub fn hook<S>(&self, module: Arc<dyn Module>, stage: S) -> Result<(), PipelineError>
    where
        S: TryInto<Stage>,
        PipelineError: From<S::Error>,
    {
        let stage = match stage.try_into() {
            Ok(stage) => stage,
            Err(e) => {
                let err = PipelineError::from(e);
                tracing::warn!(module = module.name(), error = %err, "Hook rejected");
                return Err(err);
            }
        };

        let previous = self.registry.rcu(|current| {
            let mut next = Registry::clone(current);
            next.stages[stage.index()].push(Arc::clone(&module));
            next
        });
        let count = previous.len() + 1;

        tracing::info!(module = module.name(), stage = %stage, modules = count, "Module hooked");
        metrics::set_registered_modules(count);
        Ok(())
    }

    /// Hook into the default stage.
    pub fn hook_default(&self, module: Arc<dyn Module>) -> Result<(), PipelineError> {
        self.hook(module, Stage::default())
    }

    /// Remove every entry of `module`. Returns whether it was hooked at all.
    pub fn unhook<M: Module + ?Sized>(&self, module: &Arc<M>) -> bool {
        let target = module_addr(module);
        let mut removed = 0;

        self.registry.rcu(|current| {
            let mut next = Registry::clone(current);
            removed = 0;
            for modules in next.stages.iter_mut() {
                let before = modules.len();
                modules.retain(|m| module_addr(m) != target);
                removed += before - modules.len();
            }
            next
        });

        if removed == 0 {
            tracing::debug!(module = module.name(), "Unhook of a module that is not hooked");
            return false;
        }

        let count = self.module_count();
        tracing::info!(module = module.name(), entries = removed, modules = count, "Module unhooked");
        metrics::set_registered_modules(count);
        true
    }

    /// Handle for `Module::start`.
    pub fn registrar(&self) -> Registrar<'_> {
        Registrar { pipeline: self }
    }

    /// Hook entries of `module` in each stage.
    pub(crate) fn hook_counts<M: Module + ?Sized>(&self, module: &Arc<M>) -> [usize; Stage::COUNT] {
        let target = module_addr(module);
        let registry = self.registry.load();
        let mut counts = [0; Stage::COUNT];
        for (count, modules) in counts.iter_mut().zip(registry.stages.iter()) {
            *count = modules.iter().filter(|m| module_addr(m) == target).count();
        }
        counts
    }

    /// Remove the entries of `module` beyond the first `keep[stage]` of each
    /// stage. Returns how many were removed.
    pub(crate) fn trim_hooks<M: Module + ?Sized>(&self, module: &Arc<M>, keep: [usize; Stage::COUNT]) -> usize {
        let target = module_addr(module);
        let mut removed = 0;

        self.registry.rcu(|current| {
            let mut next = Registry::clone(current);
            removed = 0;
            for (modules, &keep) in next.stages.iter_mut().zip(keep.iter()) {
                let before = modules.len();
                let mut seen = 0;
                modules.retain(|m| {
                    if module_addr(m) != target {
                        return true;
                    }
                    seen += 1;
                    seen <= keep
                });
                removed += before - modules.len();
            }
            next
        });

        if removed > 0 {
            let count = self.module_count();
            tracing::debug!(module = module.name(), entries = removed, modules = count, "Hook entries rolled back");
            metrics::set_registered_modules(count);
        }
        removed
    }

    /// Start `module` against this pipeline.
    ///
    /// If `start` fails after the module hooked itself, the entries added
    /// by this call are removed again. Entries from earlier hooks stay.
    pub fn start_module(&self, module: Arc<dyn Module>, options: &Options) -> Result<(), ModuleError> {
        let before = self.hook_counts(&module);
        match Arc::clone(&module).start(&self.registrar(), options) {
            Ok(()) => Ok(()),
            Err(e) => {
                let rolled_back = self.trim_hooks(&module, before);
                tracing::error!(module = module.name(), error = %e, rolled_back, "Module failed to start");
                Err(e)
            }
        }
    }

    /// Run `request` through every hooked module and return the result.
    ///
    /// Stages run from `ReallyFirst` to `ReallyLast`, modules within a
    /// stage in hook order. A module returning [`Flow::Halt`] ends the
    /// dispatch early.
    pub fn handle_request(&self, request: &Request) -> Response {
        let mut response = self.settings.load().default_response();
        let registry = self.registry.load_full();

        'stages: for stage in Stage::ALL {
            for module in registry.modules(stage) {
                tracing::trace!(module = module.name(), stage = %stage, "Calling module");
                if module.handle_request(request, &mut response) == Flow::Halt {
                    tracing::debug!(
                        module = module.name(),
                        stage = %stage,
                        status = response.status,
                        "Dispatch halted"
                    );
                    break 'stages;
                }
            }
        }

        response
    }

    /// Total number of hook entries across all stages.
    pub fn module_count(&self) -> usize {
        self.registry.load().len()
    }

    /// Number of hook entries in `stage`.
    pub fn stage_len(&self, stage: Stage) -> usize {
        self.registry.load().modules(stage).len()
    }

    /// Whether `module` has at least one hook entry.
    pub fn is_hooked<M: Module + ?Sized>(&self, module: &Arc<M>) -> bool {
        let target = module_addr(module);
        self.registry
            .load()
            .stages
            .iter()
            .flatten()
            .any(|m| module_addr(m) == target)
    }

    /// Names of the modules hooked into `stage`, in call order.
    pub fn stage_modules(&self, stage: Stage) -> Vec<String> {
        self.registry
            .load()
            .modules(stage)
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.load();
        let mut map = f.debug_map();
        for stage in Stage::ALL {
            let names: Vec<&str> = registry.modules(stage).iter().map(|m| m.name()).collect();
            map.entry(&stage, &names);
        }
        map.finish()
    }
}

/// Registration handle passed to [`Module::start`].
///
/// Borrows the pipeline for the duration of the call only, so modules
/// cannot keep a pointer back to it.
#[derive(Clone, Copy)]
pub struct Registrar<'p> {
    pipeline: &'p Pipeline,
}

impl Registrar<'_> {
    pub fn hook<S>(&self, module: Arc<dyn Module>, stage: S) -> Result<(), PipelineError>
    where
        S: TryInto<Stage>,
        PipelineError: From<S::Error>,
    {
        self.pipeline.hook(module, stage)
    }

    pub fn unhook<M: Module + ?Sized>(&self, module: &Arc<M>) -> bool {
        self.pipeline.unhook(module)
    }
}
