//! Method invocation on resolved controllers.

use std::sync::Arc;

use crate::routing::ResolvedTarget;

use super::registry::{ControllerManifest, ControllerRegistry, SharedController};
use super::{DispatchError, Invocation, OutputBuffer};

/// Default method when the remaining segments name none.
const DEFAULT_METHOD: &str = "index";

/// Invokes resolved targets against manifest-registered controllers.
pub struct Dispatcher {
    manifest: Arc<ControllerManifest>,
    registry: ControllerRegistry,
}

impl Dispatcher {
    pub fn new(manifest: Arc<ControllerManifest>) -> Self {
        Self {
            manifest,
            registry: ControllerRegistry::new(),
        }
    }

    /// The live instance for a resolved target, constructed on first use.
    pub fn controller_for(&self, target: &ResolvedTarget) -> Result<SharedController, DispatchError> {
        let alias = target.controller.to_lowercase();
        self.registry
            .obtain(&alias, || {
                self.manifest.construct(&target.module, &target.controller)
            })
            .ok_or_else(|| DispatchError::UnknownController {
                module: target.module.clone(),
                controller: target.controller.clone(),
            })
    }

    /// The method a target's remaining segments route to.
    pub fn method_of(target: &ResolvedTarget) -> &str {
        target
            .remaining
            .get(1)
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_METHOD)
    }

    /// Invoke the routed method with the trailing segments as arguments.
    ///
    /// The explicit return value wins over buffered output.
    pub fn invoke(
        &self,
        target: &ResolvedTarget,
        instance: &SharedController,
    ) -> Result<String, DispatchError> {
        let method = Self::method_of(target);
        let args: Vec<String> = target
            .remaining
            .iter()
            .skip(2)
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();

        let mut out = OutputBuffer::new();
        let mut guard = instance.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.invoke(method, &args, &mut out) {
            Invocation::Returned(body) => Ok(body),
            Invocation::Buffered => Ok(out.take()),
            Invocation::Unknown => {
                let err = DispatchError::MissingMethod {
                    module: target.module.clone(),
                    controller: target.controller.clone(),
                    method: method.to_string(),
                };
                tracing::error!(
                    module = %target.module,
                    controller = %target.controller,
                    method = %method,
                    "dispatch failed: method not found"
                );
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Controller;
    use crate::routing::MatchDepth;

    struct Greeter {
        seen: u32,
    }

    impl Controller for Greeter {
        fn invoke(&mut self, method: &str, args: &[String], out: &mut OutputBuffer) -> Invocation {
            match method {
                "index" => Invocation::Returned("welcome".to_string()),
                "hello" => {
                    self.seen += 1;
                    out.write(&format!("hello {} (#{})", args.join(","), self.seen));
                    Invocation::Buffered
                }
                "both" => {
                    out.write("buffered text");
                    Invocation::Returned("explicit wins".to_string())
                }
                _ => Invocation::Unknown,
            }
        }
    }

    fn manifest() -> Arc<ControllerManifest> {
        let mut m = ControllerManifest::new();
        m.register("Greet", "Greet", || Box::new(Greeter { seen: 0 }));
        Arc::new(m)
    }

    fn target(remaining: &[&str]) -> ResolvedTarget {
        ResolvedTarget {
            module: "Greet".to_string(),
            directory: "Greet/Controllers/".to_string(),
            controller: "Greet".to_string(),
            depth: MatchDepth::TopLevel,
            remaining: remaining.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_method_is_index() {
        let d = Dispatcher::new(manifest());
        let t = target(&["greet", "", ""]);
        let instance = d.controller_for(&t).unwrap();
        assert_eq!(d.invoke(&t, &instance).unwrap(), "welcome");
    }

    #[test]
    fn test_args_are_trailing_segments() {
        let d = Dispatcher::new(manifest());
        let t = target(&["greet", "hello", "alice", "bob"]);
        let instance = d.controller_for(&t).unwrap();
        assert_eq!(d.invoke(&t, &instance).unwrap(), "hello alice,bob (#1)");
    }

    #[test]
    fn test_explicit_return_wins_over_buffer() {
        let d = Dispatcher::new(manifest());
        let t = target(&["greet", "both"]);
        let instance = d.controller_for(&t).unwrap();
        assert_eq!(d.invoke(&t, &instance).unwrap(), "explicit wins");
    }

    #[test]
    fn test_singleton_instance_across_dispatches() {
        let d = Dispatcher::new(manifest());
        let t = target(&["greet", "hello", "x"]);
        let a = d.controller_for(&t).unwrap();
        let b = d.controller_for(&t).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        // State mutated by the first call is visible to the second.
        assert_eq!(d.invoke(&t, &a).unwrap(), "hello x (#1)");
        assert_eq!(d.invoke(&t, &b).unwrap(), "hello x (#2)");
    }

    #[test]
    fn test_missing_method_is_fatal() {
        let d = Dispatcher::new(manifest());
        let t = target(&["greet", "nope"]);
        let instance = d.controller_for(&t).unwrap();
        let err = d.invoke(&t, &instance).unwrap_err();
        assert!(matches!(err, DispatchError::MissingMethod { .. }));
        let msg = err.to_string();
        assert!(msg.contains("Greet") && msg.contains("nope"));
    }

    #[test]
    fn test_unknown_controller_errors() {
        let d = Dispatcher::new(manifest());
        let mut t = target(&["ghost"]);
        t.module = "Ghost".to_string();
        t.controller = "Ghost".to_string();
        assert!(matches!(
            d.controller_for(&t),
            Err(DispatchError::UnknownController { .. })
        ));
    }
}
