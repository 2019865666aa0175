//! Static file module: serves one file from disk as the response body.
//!
//! # Design Decisions
//! - The file is read on every request, so edits show up without restart
//! - A missing file maps to 404, any other read failure to 500
//! - Reads block the dispatch thread; the server runs dispatch on a
//!   blocking task for this reason

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::http::{Request, Response};
use crate::pipeline::module::stage_option;
use crate::pipeline::{Flow, Module, ModuleError, Options, Registrar, Stage};

pub const KIND: &str = "static_file";
const DEFAULT_PATH: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileSettings {
    path: PathBuf,
    content_type: Option<String>,
}

/// Options: `stage` (default `first`), `path` (default `index.html`),
/// `content_type` (default: guessed from the extension).
#[derive(Debug)]
pub struct StaticFileModule {
    settings: ArcSwap<FileSettings>,
    running: AtomicBool,
}

impl StaticFileModule {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            settings: ArcSwap::from_pointee(FileSettings {
                path: path.into(),
                content_type: None,
            }),
            running: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.settings.load().path.clone()
    }
}

impl Default for StaticFileModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for StaticFileModule {
    fn name(&self) -> &str {
        KIND
    }

    fn start(self: Arc<Self>, registrar: &Registrar<'_>, options: &Options) -> Result<(), ModuleError> {
        let stage = stage_option(KIND, options, Stage::First)?;

        let mut settings = FileSettings::clone(&self.settings.load());
        if let Some(path) = options.get("path") {
            if path.trim().is_empty() {
                return Err(ModuleError::invalid_option(KIND, "path", "must not be empty"));
            }
            settings.path = PathBuf::from(path);
        }
        if let Some(content_type) = options.get("content_type") {
            settings.content_type = Some(content_type.clone());
        }

        tracing::debug!(path = ?settings.path, "Static file module configured");
        self.settings.store(Arc::new(settings));
        self.running.store(true, Ordering::SeqCst);
        registrar.hook(self, stage)?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ModuleError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ModuleError::NotRunning(KIND.to_string()));
        }
        Ok(())
    }

    fn handle_request(&self, _request: &Request, response: &mut Response) -> Flow {
        let settings = self.settings.load();
        match fs::read(&settings.path) {
            Ok(content) => {
                let content_type = settings
                    .content_type
                    .clone()
                    .unwrap_or_else(|| guess_content_type(&settings.path).to_string());
                response.set_status(200, "OK");
                response.set_header("Content-Type", content_type);
                response.set_body(content);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = ?settings.path, "Static file not found");
                response.set_status(404, "Not Found");
                response.set_header("Content-Type", "text/html");
                response.set_body("<h1>404 Not Found</h1>");
            }
            Err(e) => {
                tracing::error!(path = ?settings.path, error = %e, "Failed to read static file");
                response.set_status(500, "Internal Server Error");
                response.set_header("Content-Type", "text/html");
                response.set_body("<h1>500 Internal Server Error</h1>");
            }
        }
        Flow::Continue
    }
}

/// Content type for a file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
