//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! Global registry specs + route specs + controller declarations
//!     → spec.rs (parse "name|only:a,b" / "name|except:a,b")
//!     → constraint filter against the dispatched method
//!     → runner.rs (resolve factory, handle() then always())
//!     → Continue, or halt with a response
//! ```
//!
//! # Design Decisions
//! - Global middlewares always run before route/controller ones;
//!   registration order is execution order within a level
//! - Constraint filtering happens before the class is resolved
//! - An unresolvable name is detailed in development and generic in
//!   production; the detail is always logged

pub mod runner;
pub mod spec;

pub use runner::{Flow, MiddlewareRegistry, MiddlewareRunner, RequestContext};
pub use spec::{Constraint, ConstraintKind, MiddlewareSpec};

use thiserror::Error;

/// Errors raised while running the middleware pipeline.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// No factory is registered under the spec's name.
    #[error("middleware `{name}` is not registered")]
    Unresolved { name: String },

    /// The spec string could not be parsed.
    #[error("malformed middleware spec `{spec}`")]
    MalformedSpec { spec: String },

    /// A middleware failed while handling the request.
    #[error("middleware `{name}` failed: {reason}")]
    Failed { name: String, reason: String },
}

/// A middleware gate run before the dispatched method.
pub trait Middleware: Send {
    /// Inspect or mutate the request context; set a halt to stop the
    /// pipeline with a response.
    fn handle(&mut self, ctx: &mut RequestContext) -> Result<(), MiddlewareError>;

    /// Invoked after `handle`, whether or not it halted.
    fn always(&mut self, _ctx: &mut RequestContext) {}
}
