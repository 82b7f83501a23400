//! Route table and registration API.
//!
//! # Responsibilities
//! - Hold routes in registration order (match priority)
//! - Verb-filtered registration: the table is built with the inbound verb
//!   and calls for other verbs are never inserted
//! - Named routes and per-pattern middleware lists
//! - Scoped `group`/`prefix`/`domain` registration context
//!
//! # Design Decisions
//! - Registration context is a stack owned by the table, never global
//!   state; the stack is restored even when a registration closure panics
//! - Re-registering an identical (pattern, verb-set) overwrites in place,
//!   keeping the original slot so match priority is stable
//! - Resource expansions use verb-set routes so all seven actions exist
//!   in the table regardless of the inbound verb

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::pattern;
use super::{RouteError, Verb};

/// Target routed segments are rewritten to when a blocked pattern matches.
/// The kernel treats this sentinel as an explicit miss.
pub const BLOCK_TARGET: &str = "_404_";

/// Where a matched route sends the request.
#[derive(Clone)]
pub enum RouteTarget {
    /// A `Module/Controller/method/$1` style path, possibly with
    /// `$n` backreferences.
    Path(String),
    /// A callback invoked with the positional captures; its return value
    /// becomes the new segment path.
    Callback(Arc<dyn Fn(&[String]) -> String + Send + Sync>),
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Path(p) => f.debug_tuple("Path").field(p).finish(),
            RouteTarget::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for RouteTarget {
    fn from(s: &str) -> Self {
        RouteTarget::Path(s.to_string())
    }
}

impl From<String> for RouteTarget {
    fn from(s: String) -> Self {
        RouteTarget::Path(s)
    }
}

impl RouteTarget {
    /// A callback target invoked with the positional captures.
    pub fn callback(f: impl Fn(&[String]) -> String + Send + Sync + 'static) -> Self {
        RouteTarget::Callback(Arc::new(f))
    }
}

/// One registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: String,
    pub target: RouteTarget,
    /// Verb set for legacy verb-keyed routes; `None` means the route was
    /// registered through a verb-filtered call and needs no match-time check.
    pub verbs: Option<BTreeSet<Verb>>,
    pub name: Option<String>,
    pub middlewares: Vec<String>,
}

/// One frame of registration context pushed by `group`/`prefix`/`domain`.
#[derive(Debug, Clone, Default)]
struct Scope {
    /// URL segment prepended to patterns registered inside the scope.
    segment: Option<String>,
    /// Namespace prepended to route names (groups only).
    namespace: Option<String>,
    /// Subdomain the inbound request must carry for registrations to apply.
    domain: Option<String>,
}

/// The route table, built once at boot and read-only afterwards.
pub struct Routes {
    verb: Verb,
    subdomain: Option<String>,
    entries: Vec<Route>,
    index: HashMap<(String, Option<BTreeSet<Verb>>), usize>,
    named: IndexMap<String, String>,
    scopes: Vec<Scope>,
    /// Validation tables register domain-scoped routes regardless of the
    /// inbound subdomain, so every pattern gets compiled at boot.
    ignore_domain: bool,
}

impl Routes {
    /// Create a table for the inbound verb and (optional) request subdomain.
    pub fn new(verb: Verb, subdomain: Option<&str>) -> Self {
        Self {
            verb,
            subdomain: subdomain.map(|s| s.to_string()),
            entries: Vec::new(),
            index: HashMap::new(),
            named: IndexMap::new(),
            scopes: Vec::new(),
            ignore_domain: false,
        }
    }

    /// A table for boot-time validation: `domain(..)` registrations are
    /// inserted no matter the subdomain, so their patterns are compiled
    /// even though no request table would carry them.
    pub fn for_validation(verb: Verb) -> Self {
        let mut table = Self::new(verb, None);
        table.ignore_domain = true;
        table
    }

    /// The verb this table was built for.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Registered routes in match-priority order.
    pub fn entries(&self) -> &[Route] {
        &self.entries
    }

    /// Compile every registered pattern, failing fast on the first
    /// malformed one. Called once at boot before traffic is served.
    pub fn validate(&self) -> Result<(), RouteError> {
        for route in &self.entries {
            pattern::compile(&route.pattern)?;
        }
        Ok(())
    }

    // ---- verb-filtered registration -------------------------------------

    pub fn get(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Get, from, to.into())
    }

    pub fn post(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Post, from, to.into())
    }

    pub fn put(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Put, from, to.into())
    }

    pub fn patch(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Patch, from, to.into())
    }

    pub fn delete(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Delete, from, to.into())
    }

    pub fn head(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Head, from, to.into())
    }

    pub fn options(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Options, from, to.into())
    }

    /// Register for every verb, including console invocations.
    pub fn any(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.insert(from, to.into(), None)
    }

    /// Register for console invocations only.
    pub fn cli(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        self.verb_route(Verb::Cli, from, to.into())
    }

    fn verb_route(&mut self, verb: Verb, from: &str, to: RouteTarget) -> RouteHandle<'_> {
        if self.verb != verb {
            return RouteHandle { routes: self, slot: None };
        }
        self.insert(from, to, None)
    }

    // ---- legacy verb-keyed registration ---------------------------------

    /// Register a verb-keyed route. The entry is always inserted; the
    /// matcher selects it by verb at match time. This is the only form
    /// that can distinguish routes sharing a pattern across verbs.
    pub fn map(&mut self, verbs: &[Verb], from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        let set: BTreeSet<Verb> = verbs.iter().copied().collect();
        self.insert(from, to.into(), Some(set))
    }

    // ---- scoped context -------------------------------------------------

    /// Register routes under a URL and name prefix.
    pub fn group(&mut self, name: &str, f: impl FnOnce(&mut Routes)) {
        self.scoped(
            Scope {
                segment: Some(name.to_string()),
                namespace: Some(name.to_string()),
                domain: None,
            },
            f,
        );
    }

    /// Register routes under a URL prefix only.
    pub fn prefix(&mut self, prefix: &str, f: impl FnOnce(&mut Routes)) {
        self.scoped(
            Scope {
                segment: Some(prefix.to_string()),
                namespace: None,
                domain: None,
            },
            f,
        );
    }

    /// Register routes that apply only when the inbound request carries
    /// the given subdomain. Filtering is eager, like verb filtering.
    pub fn domain(&mut self, subdomain: &str, f: impl FnOnce(&mut Routes)) {
        self.scoped(
            Scope {
                segment: None,
                namespace: None,
                domain: Some(subdomain.to_string()),
            },
            f,
        );
    }

    fn scoped(&mut self, scope: Scope, f: impl FnOnce(&mut Routes)) {
        self.scopes.push(scope);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(self)));
        self.scopes.pop();
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }

    // ---- resource expansion ---------------------------------------------

    /// Expand the seven conventional resource routes.
    pub fn resource(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.resource_actions(name, ResourceAction::ALL);
    }

    /// Same expansion as [`Routes::resource`].
    pub fn web_resource(&mut self, name: &str) {
        self.resource(name);
    }

    /// Resource routes without the create/edit form pages.
    pub fn api_resource(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.resource_actions(
            name,
            &[
                ResourceAction::Index,
                ResourceAction::Store,
                ResourceAction::Show,
                ResourceAction::Update,
                ResourceAction::Delete,
            ],
        );
    }

    /// Register a named subset of the resource actions. Unknown action
    /// names are ignored; an empty resource name is a no-op.
    pub fn partial(&mut self, name: &str, only: &[&str]) {
        if name.is_empty() {
            return;
        }
        let actions: Vec<ResourceAction> = only
            .iter()
            .filter_map(|a| ResourceAction::parse(a))
            .collect();
        self.resource_actions(name, &actions);
    }

    /// Id-less routes for a single-instance resource.
    pub fn singleton(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let base = resource_target_base(name);
        self.map(&[Verb::Get], name, format!("{base}/show"));
        self.map(&[Verb::Post], name, format!("{base}/store"));
        self.map(&[Verb::Put, Verb::Patch], name, format!("{base}/update"));
        self.map(&[Verb::Delete], name, format!("{base}/delete"));
    }

    /// Register only when no route with this pattern exists yet.
    pub fn unique(&mut self, from: &str, to: impl Into<RouteTarget>) -> RouteHandle<'_> {
        let pattern = self.qualified_pattern(from);
        if self.entries.iter().any(|r| r.pattern == pattern) {
            return RouteHandle { routes: self, slot: None };
        }
        self.any(from, to)
    }

    /// Route the given patterns to the explicit-miss target.
    pub fn block(&mut self, patterns: &[&str]) {
        for p in patterns {
            self.any(p, BLOCK_TARGET);
        }
    }

    fn resource_actions(&mut self, name: &str, actions: &[ResourceAction]) {
        let base = resource_target_base(name);
        for action in actions {
            match action {
                ResourceAction::Index => {
                    self.map(&[Verb::Get], name, format!("{base}/index"));
                }
                ResourceAction::Create => {
                    self.map(&[Verb::Get], &format!("{name}/create"), format!("{base}/create"));
                }
                ResourceAction::Store => {
                    self.map(&[Verb::Post], name, format!("{base}/store"));
                }
                ResourceAction::Show => {
                    self.map(&[Verb::Get], &format!("{name}/{{id}}"), format!("{base}/show/$1"));
                }
                ResourceAction::Edit => {
                    self.map(
                        &[Verb::Get],
                        &format!("{name}/{{id}}/edit"),
                        format!("{base}/edit/$1"),
                    );
                }
                ResourceAction::Update => {
                    self.map(
                        &[Verb::Put, Verb::Patch],
                        &format!("{name}/{{id}}"),
                        format!("{base}/update/$1"),
                    );
                }
                ResourceAction::Delete => {
                    self.map(
                        &[Verb::Delete],
                        &format!("{name}/{{id}}"),
                        format!("{base}/delete/$1"),
                    );
                }
            }
        }
    }

    // ---- named-route lookups --------------------------------------------

    /// Pattern registered under a route name, if any.
    pub fn pattern_of(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(|s| s.as_str())
    }

    /// Name a pattern was registered under, if any.
    pub fn name_of(&self, pattern: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|r| r.pattern == pattern)
            .and_then(|r| r.name.as_deref())
    }

    /// Middleware specs attached to a pattern. Verb-keyed routes can share
    /// a pattern, so the lists of every entry carrying it are merged in
    /// registration order.
    pub fn middlewares_of(&self, pattern: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|r| r.pattern == pattern)
            .flat_map(|r| r.middlewares.iter().cloned())
            .collect()
    }

    // ---- internals -------------------------------------------------------

    fn insert(
        &mut self,
        from: &str,
        to: RouteTarget,
        verbs: Option<BTreeSet<Verb>>,
    ) -> RouteHandle<'_> {
        if !self.ignore_domain {
            if let Some(required) = self.active_domain() {
                if self.subdomain.as_deref() != Some(required.as_str()) {
                    return RouteHandle { routes: self, slot: None };
                }
            }
        }

        let pattern = self.qualified_pattern(from);
        let key = (pattern.clone(), verbs.clone());
        let slot = match self.index.get(&key) {
            Some(&i) => {
                // Later registration overwrites in place; slot order is kept.
                self.entries[i].target = to;
                i
            }
            None => {
                self.entries.push(Route {
                    pattern,
                    target: to,
                    verbs,
                    name: None,
                    middlewares: Vec::new(),
                });
                let i = self.entries.len() - 1;
                self.index.insert(key, i);
                i
            }
        };
        RouteHandle { routes: self, slot: Some(slot) }
    }

    fn active_domain(&self) -> Option<String> {
        self.scopes.iter().rev().find_map(|s| s.domain.clone())
    }

    fn qualified_pattern(&self, from: &str) -> String {
        let mut parts: Vec<&str> = self
            .scopes
            .iter()
            .filter_map(|s| s.segment.as_deref())
            .collect();
        let from = from.trim_matches('/');
        if !from.is_empty() {
            parts.push(from);
        }
        parts.join("/")
    }

    fn qualified_name(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self
            .scopes
            .iter()
            .filter_map(|s| s.namespace.as_deref())
            .collect();
        parts.push(name);
        parts.join(":")
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("verb", &self.verb)
            .field("entries", &self.entries.len())
            .field("named", &self.named.len())
            .finish()
    }
}

/// Fluent handle returned by registration calls.
///
/// When the registration was filtered out (verb or domain mismatch) the
/// handle is inert and the fluent calls are no-ops.
pub struct RouteHandle<'a> {
    routes: &'a mut Routes,
    slot: Option<usize>,
}

impl RouteHandle<'_> {
    /// Name the route for reverse lookup.
    pub fn name(self, name: &str) -> Self {
        if let Some(i) = self.slot {
            let full = self.routes.qualified_name(name);
            let pattern = self.routes.entries[i].pattern.clone();
            self.routes.entries[i].name = Some(full.clone());
            self.routes.named.insert(full, pattern);
        }
        self
    }

    /// Attach a middleware spec (`"auth|except:login,register"`).
    pub fn middleware(self, spec: &str) -> Self {
        if let Some(i) = self.slot {
            self.routes.entries[i].middlewares.push(spec.to_string());
        }
        self
    }
}

/// The conventional resource actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceAction {
    Index,
    Create,
    Store,
    Show,
    Edit,
    Update,
    Delete,
}

impl ResourceAction {
    const ALL: &'static [ResourceAction] = &[
        ResourceAction::Index,
        ResourceAction::Create,
        ResourceAction::Store,
        ResourceAction::Show,
        ResourceAction::Edit,
        ResourceAction::Update,
        ResourceAction::Delete,
    ];

    fn parse(name: &str) -> Option<ResourceAction> {
        match name {
            "index" => Some(ResourceAction::Index),
            "create" => Some(ResourceAction::Create),
            "store" => Some(ResourceAction::Store),
            "show" => Some(ResourceAction::Show),
            "edit" => Some(ResourceAction::Edit),
            "update" => Some(ResourceAction::Update),
            "delete" => Some(ResourceAction::Delete),
            _ => None,
        }
    }
}

fn resource_target_base(name: &str) -> String {
    let module = super::studly(name);
    let controller = format!("{}Controller", super::studly(singular(name)));
    format!("{module}/{controller}")
}

fn singular(name: &str) -> &str {
    name.strip_suffix('s').filter(|s| !s.is_empty()).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_filtered_registration() {
        let mut r = Routes::new(Verb::Get, None);
        r.get("users", "Users/UsersController/index");
        r.post("users", "Users/UsersController/store");
        // Only the GET call inserted.
        assert_eq!(r.entries().len(), 1);
        assert!(matches!(
            &r.entries()[0].target,
            RouteTarget::Path(p) if p.ends_with("index")
        ));
    }

    #[test]
    fn test_identical_pattern_overwrites_in_place() {
        let mut r = Routes::new(Verb::Get, None);
        r.get("users", "A/B/first");
        r.get("other", "C/D/other");
        r.get("users", "A/B/second");
        assert_eq!(r.entries().len(), 2);
        // Slot order preserved.
        assert_eq!(r.entries()[0].pattern, "users");
        assert!(matches!(
            &r.entries()[0].target,
            RouteTarget::Path(p) if p.ends_with("second")
        ));
    }

    #[test]
    fn test_resource_expands_to_seven_routes() {
        let mut r = Routes::new(Verb::Get, None);
        r.resource("books");
        assert_eq!(r.entries().len(), 7);
        for route in r.entries() {
            match &route.target {
                RouteTarget::Path(p) => assert!(
                    p.starts_with("Books/BookController/"),
                    "unexpected target {p}"
                ),
                other => panic!("unexpected target {other:?}"),
            }
        }
    }

    #[test]
    fn test_api_resource_omits_forms() {
        let mut r = Routes::new(Verb::Get, None);
        r.api_resource("books");
        assert_eq!(r.entries().len(), 5);
        assert!(!r.entries().iter().any(|e| e.pattern.contains("create")));
        assert!(!r.entries().iter().any(|e| e.pattern.contains("edit")));
    }

    #[test]
    fn test_empty_resource_is_noop() {
        let mut r = Routes::new(Verb::Get, None);
        r.resource("");
        r.partial("", &["index"]);
        assert!(r.entries().is_empty());
    }

    #[test]
    fn test_group_prefixes_pattern_and_name() {
        let mut r = Routes::new(Verb::Get, None);
        r.group("admin", |r| {
            r.get("users", "Admin/UsersController/index").name("users");
        });
        assert_eq!(r.entries()[0].pattern, "admin/users");
        assert_eq!(r.pattern_of("admin:users"), Some("admin/users"));
    }

    #[test]
    fn test_group_context_restored_after_closure() {
        let mut r = Routes::new(Verb::Get, None);
        r.group("admin", |r| {
            r.get("inside", "A/B/c");
        });
        r.get("outside", "A/B/c");
        assert_eq!(r.entries()[1].pattern, "outside");
    }

    #[test]
    fn test_group_context_restored_on_panic() {
        let mut r = Routes::new(Verb::Get, None);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            r.group("admin", |_| panic!("boom"));
        }));
        assert!(result.is_err());
        r.get("after", "A/B/c");
        assert_eq!(r.entries().last().unwrap().pattern, "after");
    }

    #[test]
    fn test_nested_prefixes_stack() {
        let mut r = Routes::new(Verb::Get, None);
        r.prefix("api", |r| {
            r.prefix("v1", |r| {
                r.get("users", "Api/UsersController/index");
            });
        });
        assert_eq!(r.entries()[0].pattern, "api/v1/users");
    }

    #[test]
    fn test_domain_scoping_is_eager() {
        let mut r = Routes::new(Verb::Get, Some("app"));
        r.domain("app", |r| {
            r.get("dash", "App/DashController/index");
        });
        r.domain("admin", |r| {
            r.get("panel", "Admin/PanelController/index");
        });
        assert_eq!(r.entries().len(), 1);
        assert_eq!(r.entries()[0].pattern, "dash");
    }

    #[test]
    fn test_validation_table_keeps_domain_scoped_routes() {
        let mut r = Routes::for_validation(Verb::Get);
        r.domain("admin", |r| {
            r.get("panel", "Admin/PanelController/index");
        });
        assert_eq!(r.entries().len(), 1);
        assert_eq!(r.entries()[0].pattern, "panel");
    }

    #[test]
    fn test_named_route_lookup_before_and_after() {
        let mut r = Routes::new(Verb::Get, None);
        assert_eq!(r.pattern_of("app:baseurl"), None);
        r.get("app/baseurl", "App/AppController/baseurl").name("app:baseurl");
        assert_eq!(r.pattern_of("app:baseurl"), Some("app/baseurl"));
    }

    #[test]
    fn test_unique_does_not_overwrite() {
        let mut r = Routes::new(Verb::Get, None);
        r.get("users", "A/B/first");
        r.unique("users", "A/B/second");
        assert_eq!(r.entries().len(), 1);
        assert!(matches!(
            &r.entries()[0].target,
            RouteTarget::Path(p) if p.ends_with("first")
        ));
    }

    #[test]
    fn test_block_routes_to_miss_sentinel() {
        let mut r = Routes::new(Verb::Get, None);
        r.block(&["secret/(:any)"]);
        assert!(matches!(
            &r.entries()[0].target,
            RouteTarget::Path(p) if p == BLOCK_TARGET
        ));
    }

    #[test]
    fn test_middleware_attaches_to_pattern() {
        let mut r = Routes::new(Verb::Get, None);
        r.get("users", "Users/UsersController/index")
            .middleware("auth|except:index");
        assert_eq!(r.middlewares_of("users"), vec!["auth|except:index".to_string()]);
    }

    #[test]
    fn test_middlewares_merge_across_entries_sharing_a_pattern() {
        let mut r = Routes::new(Verb::Get, None);
        r.map(&[Verb::Get], "me", "Profile/ProfileController/show")
            .middleware("throttle");
        r.map(&[Verb::Put, Verb::Patch], "me", "Profile/ProfileController/update")
            .middleware("auth");
        // The pattern carries both lists, in registration order.
        assert_eq!(
            r.middlewares_of("me"),
            vec!["throttle".to_string(), "auth".to_string()]
        );
    }

    #[test]
    fn test_singleton_registers_idless_quartet() {
        let mut r = Routes::new(Verb::Get, None);
        r.singleton("profile");
        assert_eq!(r.entries().len(), 4);
        assert!(r.entries().iter().all(|e| e.pattern == "profile"));
        assert!(r
            .entries()
            .iter()
            .all(|e| matches!(&e.target, RouteTarget::Path(p) if p.starts_with("Profile/ProfileController/"))));
    }
}
