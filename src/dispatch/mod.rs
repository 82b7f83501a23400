//! Controller dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! ResolvedTarget (from the module resolver)
//!     → registry.rs (manifest lookup, singleton instance per alias)
//!     → dispatcher.rs (method + args from remaining segments, invoke)
//!     → Response body (explicit return wins over buffered output)
//! ```
//!
//! # Design Decisions
//! - Controllers are constructed through a boot-time factory manifest,
//!   never by reflection on a runtime string
//! - One live instance per lower-cased alias per process; state from an
//!   earlier call is visible to later ones
//! - A missing method is a wiring error and always fatal

pub mod dispatcher;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use registry::{ControllerManifest, ControllerRegistry, SharedController};

use thiserror::Error;

/// Errors raised while dispatching a resolved target.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The resolved controller has no factory in the manifest.
    #[error("no controller registered for `{module}/{controller}`")]
    UnknownController { module: String, controller: String },

    /// The controller exists but does not expose the routed method.
    #[error("controller `{controller}` in module `{module}` has no method `{method}`")]
    MissingMethod {
        module: String,
        controller: String,
        method: String,
    },
}

/// Captures side-effect output emitted while a controller method runs.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buf: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the buffered response body.
    pub fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drain the buffered output.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

/// What a controller method invocation produced.
#[derive(Debug)]
pub enum Invocation {
    /// Explicit return value; overrides anything written to the buffer.
    Returned(String),
    /// No explicit return; the buffered output is the response body.
    Buffered,
    /// The controller has no such method.
    Unknown,
}

/// A dispatchable controller or console command.
///
/// Implementations match on the method name and treat the remaining URI
/// segments as positional string arguments.
pub trait Controller: Send {
    fn invoke(&mut self, method: &str, args: &[String], out: &mut OutputBuffer) -> Invocation;

    /// Middleware specs this controller declares for itself.
    fn middleware(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_buffer_accumulates() {
        let mut out = OutputBuffer::new();
        out.write("hello ");
        out.write("world");
        assert_eq!(out.take(), "hello world");
        assert!(out.is_empty());
    }
}
