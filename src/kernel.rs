//! Request pipeline orchestration.
//!
//! # Data Flow
//! ```text
//! URI + verb (HTTP front or console argv)
//!     → route table built by the app's registration closure
//!     → RouteMatcher (rewrite segments, or fall back to raw URI)
//!     → ModuleResolver (locate controller across module roots)
//!     → MiddlewareRunner (global + route + controller gates)
//!     → Dispatcher (invoke, capture output)
//!     → Response { status, body }
//! ```
//!
//! # Design Decisions
//! - Resolution misses are recoverable: they route to the configured
//!   404 override before giving up
//! - Dispatch and middleware failures are programming errors: always
//!   logged, detailed in development, generic in production
//! - Route patterns are validated for every verb at boot so malformed
//!   patterns never reach traffic

use std::sync::Arc;

use thiserror::Error;

use crate::config::{AppConfig, Environment};
use crate::dispatch::{ControllerManifest, DispatchError, Dispatcher};
use crate::middleware::{Flow, MiddlewareError, MiddlewareRegistry, MiddlewareRunner, RequestContext};
use crate::routing::table::BLOCK_TARGET;
use crate::routing::{
    normalize_uri, LocateOutcome, ModuleLocation, ModuleResolver, RequestKind, ResolvedTarget,
    RouteError, RouteMatcher, Routes, Verb,
};

/// Response handed to the HTTP output layer or the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn not_found() -> Self {
        Self { status: 404, body: "404 Page Not Found".to_string() }
    }

    fn server_error(body: impl Into<String>) -> Self {
        Self { status: 500, body: body.into() }
    }
}

/// Errors that abort boot before traffic is served.
#[derive(Debug, Error)]
pub enum BootError {
    #[error(transparent)]
    Route(#[from] RouteError),
}

type RoutesSetup = Arc<dyn Fn(&mut Routes) + Send + Sync>;

/// The assembled application core.
pub struct Kernel {
    config: Arc<AppConfig>,
    routes_setup: RoutesSetup,
    resolver: ModuleResolver,
    dispatcher: Dispatcher,
    middleware: MiddlewareRegistry,
}

impl Kernel {
    pub fn builder(config: AppConfig) -> KernelBuilder {
        KernelBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the route table for one request.
    pub fn routes_for(&self, verb: Verb, subdomain: Option<&str>) -> Routes {
        let mut table = Routes::new(verb, subdomain);
        (self.routes_setup)(&mut table);
        table
    }

    /// Handle one request end to end.
    pub fn handle(&self, uri: &str, verb: Verb, subdomain: Option<&str>) -> Response {
        let table = self.routes_for(verb, subdomain);
        let segments = normalize_uri(uri);

        let matcher = RouteMatcher::new(&table);
        let (segments, matched_pattern) = match matcher.match_uri(&segments, verb) {
            Ok(Some(m)) => (m.target_segments, Some(m.pattern)),
            Ok(None) => (segments, None),
            Err(e) => {
                tracing::error!(error = %e, "route table failed during matching");
                return self.failure(&e.to_string());
            }
        };

        if segments.first().map(String::as_str) == Some(BLOCK_TARGET) {
            tracing::debug!(uri = %uri, "request hit a blocked route");
            return self.miss(verb);
        }

        let kind = if verb == Verb::Cli { RequestKind::Cli } else { RequestKind::Web };
        match self.resolver.locate(&segments, kind) {
            LocateOutcome::Matched(target) => {
                self.run_target(&table, &target, matched_pattern.as_deref(), verb)
            }
            outcome => {
                tracing::debug!(uri = %uri, ?outcome, "module resolution missed");
                self.miss(verb)
            }
        }
    }

    /// Handle a console invocation: argv segments joined as a URI.
    pub fn handle_cli(&self, args: &[String]) -> Response {
        self.handle(&args.join("/"), Verb::Cli, None)
    }

    /// 404-override resolution; falls back to the plain 404 response.
    fn miss(&self, verb: Verb) -> Response {
        let Some(override_target) = &self.config.routing.override_404 else {
            return Response::not_found();
        };
        let segments = normalize_uri(override_target);
        let kind = if verb == Verb::Cli { RequestKind::Cli } else { RequestKind::Web };
        match self.resolver.locate(&segments, kind) {
            LocateOutcome::Matched(target) => {
                let mut response = self.run_target_bare(&target, verb);
                if response.status == 200 {
                    response.status = 404;
                }
                response
            }
            _ => {
                tracing::debug!(target = %override_target, "404 override did not resolve");
                Response::not_found()
            }
        }
    }

    fn run_target(
        &self,
        table: &Routes,
        target: &ResolvedTarget,
        matched_pattern: Option<&str>,
        verb: Verb,
    ) -> Response {
        let instance = match self.dispatcher.controller_for(target) {
            Ok(i) => i,
            Err(e) => return self.dispatch_failure(e),
        };

        let method = Dispatcher::method_of(target).to_string();
        let mut specs: Vec<String> = Vec::new();
        if let Some(pattern) = matched_pattern {
            specs.extend(table.middlewares_of(pattern));
        }
        {
            let guard = instance.lock().unwrap_or_else(|p| p.into_inner());
            specs.extend(guard.middleware());
        }

        let mut ctx = RequestContext::new(target.remaining.clone(), verb, &method);
        let runner = MiddlewareRunner::new(&self.middleware);
        match runner.run(&specs, &method, &mut ctx) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Halt { status, body }) => return Response { status, body },
            Err(e) => return self.middleware_failure(e),
        }

        match self.dispatcher.invoke(target, &instance) {
            Ok(body) => Response::ok(body),
            Err(e) => self.dispatch_failure(e),
        }
    }

    /// Dispatch without route middlewares, used for the 404 override.
    fn run_target_bare(&self, target: &ResolvedTarget, verb: Verb) -> Response {
        let empty = Routes::new(verb, None);
        self.run_target(&empty, target, None, verb)
    }

    fn dispatch_failure(&self, error: DispatchError) -> Response {
        tracing::error!(error = %error, "dispatch failed");
        self.failure(&error.to_string())
    }

    fn middleware_failure(&self, error: MiddlewareError) -> Response {
        tracing::error!(error = %error, "middleware pipeline failed");
        self.failure(&error.to_string())
    }

    /// Detailed in development, generic in production. The detail has
    /// already been logged either way.
    fn failure(&self, detail: &str) -> Response {
        match self.config.environment {
            Environment::Development => Response::server_error(detail),
            Environment::Production => Response::server_error("Internal Server Error"),
        }
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("environment", &self.config.environment)
            .finish()
    }
}

/// Assembles a [`Kernel`] from config, routes, controllers and middleware.
pub struct KernelBuilder {
    config: AppConfig,
    routes_setup: Option<RoutesSetup>,
    manifest: ControllerManifest,
    middleware: MiddlewareRegistry,
}

impl KernelBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            routes_setup: None,
            manifest: ControllerManifest::new(),
            middleware: MiddlewareRegistry::new(),
        }
    }

    /// The app's route-registration closure, executed for every request.
    pub fn routes(mut self, setup: impl Fn(&mut Routes) + Send + Sync + 'static) -> Self {
        self.routes_setup = Some(Arc::new(setup));
        self
    }

    pub fn controllers(mut self, build: impl FnOnce(&mut ControllerManifest)) -> Self {
        build(&mut self.manifest);
        self
    }

    pub fn middleware(mut self, build: impl FnOnce(&mut MiddlewareRegistry)) -> Self {
        build(&mut self.middleware);
        self
    }

    /// Validate the route table for every verb and assemble the kernel.
    pub fn build(self) -> Result<Kernel, BootError> {
        let routes_setup = self.routes_setup.unwrap_or_else(|| Arc::new(|_: &mut Routes| {}));

        // Fail fast: malformed patterns must never reach traffic. The
        // validation table bypasses domain filtering so subdomain-scoped
        // patterns are compiled too.
        for verb in [
            Verb::Get,
            Verb::Post,
            Verb::Put,
            Verb::Patch,
            Verb::Delete,
            Verb::Head,
            Verb::Options,
            Verb::Cli,
        ] {
            let mut table = Routes::for_validation(verb);
            routes_setup(&mut table);
            table.validate()?;
        }

        let routing = &self.config.routing;
        let locations: Vec<ModuleLocation> = routing
            .module_locations
            .iter()
            .map(|l| ModuleLocation {
                path: l.path.clone().into(),
                offset: l.offset.clone(),
            })
            .collect();
        let mut resolver = ModuleResolver::new(
            locations,
            routing.app_root.clone(),
            routing.core_root.clone(),
            routing.controller_ext.clone(),
        );
        if routing.cache_resolutions {
            resolver = resolver.with_cache();
        }

        Ok(Kernel {
            config: Arc::new(self.config),
            routes_setup,
            resolver,
            dispatcher: Dispatcher::new(Arc::new(self.manifest)),
            middleware: self.middleware,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Controller, Invocation, OutputBuffer};
    use std::fs;
    use tempfile::TempDir;

    struct Pages;

    impl Controller for Pages {
        fn invoke(&mut self, method: &str, args: &[String], out: &mut OutputBuffer) -> Invocation {
            match method {
                "index" => Invocation::Returned("pages index".to_string()),
                "show" => {
                    out.write(&format!("page {}", args.join("/")));
                    Invocation::Buffered
                }
                _ => Invocation::Unknown,
            }
        }
    }

    struct Errors;

    impl Controller for Errors {
        fn invoke(&mut self, method: &str, _args: &[String], _out: &mut OutputBuffer) -> Invocation {
            match method {
                "show404" => Invocation::Returned("custom not found".to_string()),
                _ => Invocation::Unknown,
            }
        }
    }

    fn app(tmp: &TempDir, override_404: Option<&str>) -> Kernel {
        fs::create_dir_all(tmp.path().join("modules/Pages/Controllers")).unwrap();
        fs::write(tmp.path().join("modules/Pages/Controllers/Pages.php"), "").unwrap();
        fs::create_dir_all(tmp.path().join("modules/Errors/Controllers")).unwrap();
        fs::write(tmp.path().join("modules/Errors/Controllers/Errors.php"), "").unwrap();

        let mut config = AppConfig::default();
        config.routing.module_locations[0].path =
            tmp.path().join("modules").to_string_lossy().into_owned();
        config.routing.app_root = tmp.path().join("app").to_string_lossy().into_owned();
        config.routing.core_root = tmp.path().join("core").to_string_lossy().into_owned();
        config.routing.override_404 = override_404.map(|s| s.to_string());

        Kernel::builder(config)
            .routes(|r| {
                r.get("p/(:num)", "pages/pages/show/$1");
                r.get("boom", "pages/pages/nope");
                r.block(&["secret"]);
            })
            .controllers(|m| {
                m.register("Pages", "Pages", || Box::new(Pages));
                m.register("Errors", "Errors", || Box::new(Errors));
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_matched_route_dispatches() {
        let tmp = TempDir::new().unwrap();
        let kernel = app(&tmp, None);
        let r = kernel.handle("/p/7", Verb::Get, None);
        assert_eq!(r, Response::ok("page 7"));
    }

    #[test]
    fn test_unmatched_uri_falls_back_to_raw_segments() {
        let tmp = TempDir::new().unwrap();
        let kernel = app(&tmp, None);
        let r = kernel.handle("/pages", Verb::Get, None);
        assert_eq!(r, Response::ok("pages index"));
    }

    #[test]
    fn test_unresolved_module_is_404() {
        let tmp = TempDir::new().unwrap();
        let kernel = app(&tmp, None);
        let r = kernel.handle("/ghost/town", Verb::Get, None);
        assert_eq!(r.status, 404);
    }

    #[test]
    fn test_override_404_dispatches_custom_controller() {
        let tmp = TempDir::new().unwrap();
        let kernel = app(&tmp, Some("errors/errors/show404"));
        let r = kernel.handle("/ghost/town", Verb::Get, None);
        assert_eq!(r.status, 404);
        assert_eq!(r.body, "custom not found");
    }

    #[test]
    fn test_blocked_route_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let kernel = app(&tmp, None);
        let r = kernel.handle("/secret", Verb::Get, None);
        assert_eq!(r.status, 404);
    }

    #[test]
    fn test_missing_method_detail_shown_in_development() {
        let tmp = TempDir::new().unwrap();
        let kernel = app(&tmp, None);
        let r = kernel.handle("/boom", Verb::Get, None);
        assert_eq!(r.status, 500);
        assert!(r.body.contains("nope"));
    }

    #[test]
    fn test_malformed_pattern_fails_at_boot() {
        let err = Kernel::builder(AppConfig::default())
            .routes(|r| {
                r.get("broken/(unclosed", "A/B/c");
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BootError::Route(_)));
    }

    #[test]
    fn test_domain_scoped_malformed_pattern_fails_at_boot() {
        // The domain filter must not hide bad patterns from validation.
        let err = Kernel::builder(AppConfig::default())
            .routes(|r| {
                r.domain("admin", |r| {
                    r.get("broken/(unclosed", "A/B/c");
                });
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BootError::Route(_)));
    }
}
