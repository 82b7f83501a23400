//! Default application scaffold.
//!
//! A minimal application wired through the kernel builder: a welcome
//! controller, its routes, and a request-logging middleware. The binaries
//! use it as the out-of-the-box app; replace the three registration
//! functions to mount your own.
//!
//! Controllers dispatch only when the matching source file exists under a
//! configured module root (for the welcome page, `app/Controllers/Welcome.php`
//! with the default config). The manifest supplies the implementation; the
//! file is the routing convention.

use crate::dispatch::{Controller, ControllerManifest, Invocation, OutputBuffer};
use crate::middleware::{Middleware, MiddlewareError, MiddlewareRegistry, RequestContext};
use crate::routing::Routes;

/// Landing-page controller.
struct Welcome;

impl Controller for Welcome {
    fn invoke(&mut self, method: &str, args: &[String], out: &mut OutputBuffer) -> Invocation {
        match method {
            "index" => Invocation::Returned("Welcome to Webby.".to_string()),
            "hello" => {
                let name = args.first().map(String::as_str).unwrap_or("world");
                out.write(&format!("Hello, {name}!"));
                Invocation::Buffered
            }
            _ => Invocation::Unknown,
        }
    }
}

/// Logs every request that reaches the middleware pipeline.
struct RequestLog;

impl Middleware for RequestLog {
    fn handle(&mut self, ctx: &mut RequestContext) -> Result<(), MiddlewareError> {
        tracing::info!(
            request_id = %ctx.id,
            method = %ctx.method,
            segments = %ctx.segments.join("/"),
            "handling request"
        );
        Ok(())
    }
}

/// Default route table.
pub fn routes(r: &mut Routes) {
    r.get("/", "welcome").name("home");
    r.get("hello/(:alpha)", "welcome/hello/$1");
}

/// Default controller manifest.
pub fn controllers(m: &mut ControllerManifest) {
    m.register("Welcome", "Welcome", || Box::new(Welcome));
}

/// Default middleware registry.
pub fn middleware(reg: &mut MiddlewareRegistry) {
    reg.register("request-log", || Box::new(RequestLog));
    reg.global("request-log");
}
