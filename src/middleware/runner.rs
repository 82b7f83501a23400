//! Middleware resolution and execution.

use std::collections::HashMap;

use uuid::Uuid;

use crate::routing::Verb;

use super::spec::MiddlewareSpec;
use super::{Middleware, MiddlewareError};

type Factory = Box<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;

/// Mutable request state visible to middlewares.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Correlation ID for this dispatch.
    pub id: Uuid,
    pub segments: Vec<String>,
    pub verb: Option<Verb>,
    /// The method about to be dispatched.
    pub method: String,
    /// Data middlewares pass to each other and to the controller.
    pub extensions: HashMap<String, String>,
    halt: Option<(u16, String)>,
}

impl RequestContext {
    pub fn new(segments: Vec<String>, verb: Verb, method: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            segments,
            verb: Some(verb),
            method: method.to_string(),
            extensions: HashMap::new(),
            halt: None,
        }
    }

    /// Stop the pipeline and answer with the given status and body.
    pub fn halt(&mut self, status: u16, body: impl Into<String>) {
        self.halt = Some((status, body.into()));
    }

    fn take_halt(&mut self) -> Option<(u16, String)> {
        self.halt.take()
    }
}

/// What the pipeline decided.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    /// All gates passed; dispatch proceeds.
    Continue,
    /// A middleware halted the request with this response.
    Halt { status: u16, body: String },
}

/// Named middleware factories plus the always-run global list.
#[derive(Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, Factory>,
    global: Vec<String>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named middleware factory.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Middleware> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Add a spec to the global list, run before all route/controller
    /// middlewares in registration order.
    pub fn global(&mut self, spec: &str) {
        self.global.push(spec.to_string());
    }

    pub fn global_specs(&self) -> &[String] {
        &self.global
    }

    fn construct(&self, name: &str) -> Option<Box<dyn Middleware>> {
        self.factories.get(name).map(|f| f())
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("factories", &self.factories.len())
            .field("global", &self.global)
            .finish()
    }
}

/// Runs a linear middleware pipeline for one request.
pub struct MiddlewareRunner<'a> {
    registry: &'a MiddlewareRegistry,
}

impl<'a> MiddlewareRunner<'a> {
    pub fn new(registry: &'a MiddlewareRegistry) -> Self {
        Self { registry }
    }

    /// Run the global specs followed by `specs`, filtered by the current
    /// method, stopping at the first halt.
    pub fn run(
        &self,
        specs: &[String],
        current_method: &str,
        ctx: &mut RequestContext,
    ) -> Result<Flow, MiddlewareError> {
        let merged = self.registry.global_specs().iter().chain(specs.iter());

        for raw in merged {
            let spec = MiddlewareSpec::parse(raw)?;
            if !spec.applies_to(current_method) {
                continue;
            }

            let mut mw = self
                .registry
                .construct(&spec.name)
                .ok_or_else(|| MiddlewareError::Unresolved { name: spec.name.clone() })?;

            let handled = mw.handle(ctx);
            mw.always(ctx);
            handled?;

            if let Some((status, body)) = ctx.take_halt() {
                tracing::debug!(middleware = %spec.name, status, "middleware halted request");
                return Ok(Flow::Halt { status, body });
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Recorder {
        label: &'static str,
        log: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Middleware for Recorder {
        fn handle(&mut self, _ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
            self.log.lock().unwrap().push(format!("{}:handle", self.label));
            Ok(())
        }

        fn always(&mut self, _ctx: &mut RequestContext) {
            self.log.lock().unwrap().push(format!("{}:always", self.label));
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn handle(&mut self, ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
            ctx.halt(401, "denied");
            Ok(())
        }
    }

    struct CountingAuth(Arc<AtomicUsize>);

    impl Middleware for CountingAuth {
        fn handle(&mut self, _ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn ctx(method: &str) -> RequestContext {
        RequestContext::new(vec![], Verb::Get, method)
    }

    #[test]
    fn test_global_runs_before_route_specs() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut reg = MiddlewareRegistry::new();
        let l1 = log.clone();
        reg.register("first", move || {
            Box::new(Recorder { label: "global", log: l1.clone() })
        });
        let l2 = log.clone();
        reg.register("second", move || {
            Box::new(Recorder { label: "route", log: l2.clone() })
        });
        reg.global("first");

        let runner = MiddlewareRunner::new(&reg);
        let flow = runner
            .run(&["second".to_string()], "index", &mut ctx("index"))
            .unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["global:handle", "global:always", "route:handle", "route:always"]
        );
    }

    #[test]
    fn test_only_constraint_skips_resolution() {
        // "auth|only:store,update" never runs handle() for index.
        let hits = Arc::new(AtomicUsize::new(0));
        let mut reg = MiddlewareRegistry::new();
        let h = hits.clone();
        reg.register("auth", move || Box::new(CountingAuth(h.clone())));

        let runner = MiddlewareRunner::new(&reg);
        runner
            .run(&["auth|only:store,update".to_string()], "index", &mut ctx("index"))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        runner
            .run(&["auth|only:store,update".to_string()], "store", &mut ctx("store"))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_halt_stops_pipeline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut reg = MiddlewareRegistry::new();
        reg.register("deny", || Box::new(Deny));
        let h = hits.clone();
        reg.register("after", move || Box::new(CountingAuth(h.clone())));

        let runner = MiddlewareRunner::new(&reg);
        let flow = runner
            .run(
                &["deny".to_string(), "after".to_string()],
                "index",
                &mut ctx("index"),
            )
            .unwrap();
        assert_eq!(flow, Flow::Halt { status: 401, body: "denied".to_string() });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unresolved_middleware_is_an_error() {
        let reg = MiddlewareRegistry::new();
        let runner = MiddlewareRunner::new(&reg);
        let err = runner
            .run(&["ghost".to_string()], "index", &mut ctx("index"))
            .unwrap_err();
        assert!(matches!(err, MiddlewareError::Unresolved { ref name } if name == "ghost"));
    }

    #[test]
    fn test_unresolved_spec_not_reached_when_filtered() {
        // The constraint filter runs before resolution, so a constrained
        // spec for an unknown name is harmless off-method.
        let reg = MiddlewareRegistry::new();
        let runner = MiddlewareRunner::new(&reg);
        let flow = runner
            .run(&["ghost|only:store".to_string()], "index", &mut ctx("index"))
            .unwrap();
        assert_eq!(flow, Flow::Continue);
    }
}
