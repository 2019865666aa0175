//! Built-in modules.
//!
//! | kind           | default stage  | effect                                   |
//! |----------------|----------------|------------------------------------------|
//! | `request_id`   | `really_first` | sets `X-Request-Id` on the response      |
//! | `echo`         | `first`        | 200 with a page describing the request   |
//! | `static_file`  | `first`        | 200 with a file from disk, 404/500 on error |
//! | `response_log` | `really_last`  | logs the final response                  |
//!
//! Every module accepts a `stage` option overriding its default stage.

use std::sync::Arc;

use crate::pipeline::Module;

pub mod echo;
pub mod request_id;
pub mod response_log;
pub mod static_file;

pub use echo::EchoModule;
pub use request_id::RequestIdModule;
pub use response_log::ResponseLogModule;
pub use static_file::StaticFileModule;

/// Every kind accepted by [`build`].
pub const KINDS: &[&str] = &[echo::KIND, request_id::KIND, response_log::KIND, static_file::KIND];

/// Create a fresh, not yet started module of `kind`.
pub fn build(kind: &str) -> Option<Arc<dyn Module>> {
    let module: Arc<dyn Module> = match kind {
        echo::KIND => Arc::new(EchoModule::new()),
        request_id::KIND => Arc::new(RequestIdModule::new()),
        response_log::KIND => Arc::new(ResponseLogModule::new()),
        static_file::KIND => Arc::new(StaticFileModule::new()),
        _ => return None,
    };
    Some(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_builds() {
        for kind in KINDS {
            let module = build(kind).unwrap();
            assert_eq!(module.name(), *kind);
        }
    }

    #[test]
    fn unknown_kind() {
        assert!(build("teleport").is_none());
    }
}
