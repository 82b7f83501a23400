//! Route pattern compilation.
//!
//! # Responsibilities
//! - Translate named placeholders (`{id}`, `{uuid}`, `{slug}`) to regex classes
//! - Translate wildcard tokens (`(:any)`, `:num`, ...) to regex fragments
//! - Anchor the result so patterns always match the full URI
//!
//! # Design Decisions
//! - Compilation is a pure function of the pattern string; results are
//!   cached process-wide so repeated matching never recompiles
//! - Malformed patterns fail at registration time, not at match time
//! - Literal patterns are short-circuited by the matcher before any
//!   regex work happens; this module never sees them on the hot path

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use regex::Regex;
use thiserror::Error;

/// RFC-4122 8-4-4-4-12 hex-group fragment, shared by `{uuid}` and `(:uuid)`.
const UUID_FRAGMENT: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

/// Errors raised while building a route table.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The user-authored pattern produced an invalid regex.
    #[error("malformed route pattern `{pattern}`: {source}")]
    MalformedPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
}

/// A compiled route pattern.
#[derive(Debug)]
pub struct CompiledPattern {
    /// Anchored regex matched against the full normalized URI.
    pub regex: Regex,
    /// Number of capture groups available for backreference substitution.
    pub param_count: usize,
}

fn cache() -> &'static DashMap<String, Arc<CompiledPattern>> {
    static CACHE: OnceLock<DashMap<String, Arc<CompiledPattern>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Compile a route pattern into an anchored regex.
///
/// The same pattern string always yields the same compiled output.
pub fn compile(pattern: &str) -> Result<Arc<CompiledPattern>, RouteError> {
    if let Some(hit) = cache().get(pattern) {
        return Ok(hit.clone());
    }

    let body = expand_wildcards(&expand_placeholders(pattern));
    let anchored = format!("^{}$", body);
    let regex = Regex::new(&anchored).map_err(|e| RouteError::MalformedPattern {
        pattern: pattern.to_string(),
        source: Box::new(e),
    })?;
    let param_count = regex.captures_len() - 1;

    let compiled = Arc::new(CompiledPattern { regex, param_count });
    cache().insert(pattern.to_string(), compiled.clone());
    Ok(compiled)
}

/// Named-placeholder pass.
///
/// `{id}`/`{num}` become a digit class, the well-known names get their
/// character classes, and any other `{name}` becomes a catch-all non-slash
/// group — but only when the pattern carries no `{id}`, mirroring the
/// original's replacement order.
fn expand_placeholders(pattern: &str) -> String {
    let has_id = pattern.contains("{id}");

    let mut out = pattern
        .replace("{id}", "([0-9]+)")
        .replace("{num}", "([0-9]+)")
        .replace("{uuid}", &format!("({})", UUID_FRAGMENT))
        .replace("{alphanum}", "([a-zA-Z0-9]+)")
        .replace("{alpha}", "([a-zA-Z]+)")
        .replace("{subdomain}", "([a-zA-Z0-9-]+)");

    if !has_id {
        static NAMED: OnceLock<Regex> = OnceLock::new();
        let named = NAMED
            .get_or_init(|| Regex::new(r"\{[a-zA-Z_][a-zA-Z0-9_]*\}").expect("literal regex"));
        out = named.replace_all(&out, "([^/]+)").into_owned();
    }
    out
}

/// Wildcard pass for the CI-style tokens.
///
/// Parenthesized forms capture; bare forms match without capturing.
fn expand_wildcards(pattern: &str) -> String {
    let uuid_group = format!("({})", UUID_FRAGMENT);
    pattern
        .replace("(:any)", "([^/]+)")
        .replace("(:num)", "([0-9]+)")
        .replace("(:uuid)", &uuid_group)
        .replace("(:alphanum)", "([a-zA-Z0-9.]+)")
        .replace("(:alpha)", "([a-zA-Z]+)")
        .replace("(:subdomain)", "([a-zA-Z0-9-]+)")
        .replace(":any", "[^/]+")
        .replace(":num", "[0-9]+")
        .replace(":uuid", UUID_FRAGMENT)
        .replace(":alphanum", "[a-zA-Z0-9.]+")
        .replace(":alpha", "[a-zA-Z]+")
        .replace(":subdomain", "[a-zA-Z0-9-]+")
}
