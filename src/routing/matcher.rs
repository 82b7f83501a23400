//! Route matching.
//!
//! # Responsibilities
//! - Walk the route table in registration order
//! - Select verb-keyed routes by the inbound verb
//! - Apply callback targets and `$n` backreference substitution
//!
//! # Design Decisions
//! - First registered match wins; specific routes must be registered
//!   before catch-alls
//! - Literal pattern equality is checked before the regex engine runs
//! - No match is not an error: the caller falls back to the raw segments

use super::table::{RouteTarget, Routes};
use super::{join_segments, normalize_uri, pattern, RouteError, Verb};

/// A successful route match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// The rewritten segment path the request proceeds with.
    pub target_segments: Vec<String>,
    /// The pattern that matched, for middleware and named-route lookups.
    pub pattern: String,
}

/// Matches URIs against a built route table.
pub struct RouteMatcher<'a> {
    table: &'a Routes,
}

impl<'a> RouteMatcher<'a> {
    pub fn new(table: &'a Routes) -> Self {
        Self { table }
    }

    /// Match the URI segments for the given verb.
    ///
    /// Returns `Ok(None)` when no route matched; the caller then proceeds
    /// with the original segments (the default-route behavior).
    pub fn match_uri(
        &self,
        segments: &[String],
        verb: Verb,
    ) -> Result<Option<MatchResult>, RouteError> {
        let uri = join_segments(segments);

        for route in self.table.entries() {
            if let Some(verbs) = &route.verbs {
                if !verbs.contains(&verb) {
                    continue;
                }
            }

            // Exact literal match short-circuits without touching the
            // regex engine.
            if route.pattern == uri {
                let rewritten = resolve_target(&route.target, &[]);
                tracing::debug!(pattern = %route.pattern, uri = %uri, "route matched (literal)");
                return Ok(Some(MatchResult {
                    target_segments: normalize_uri(&rewritten),
                    pattern: route.pattern.clone(),
                }));
            }

            let compiled = pattern::compile(&route.pattern)?;
            if let Some(caps) = compiled.regex.captures(&uri) {
                let captures: Vec<String> = caps
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                let rewritten = resolve_target(&route.target, &captures);
                tracing::debug!(pattern = %route.pattern, uri = %uri, "route matched");
                return Ok(Some(MatchResult {
                    target_segments: normalize_uri(&rewritten),
                    pattern: route.pattern.clone(),
                }));
            }
        }

        tracing::debug!(uri = %uri, verb = %verb, "no route matched, using raw segments");
        Ok(None)
    }
}

fn resolve_target(target: &RouteTarget, captures: &[String]) -> String {
    match target {
        RouteTarget::Callback(f) => f(captures),
        RouteTarget::Path(t) => {
            if t.contains('$') && !captures.is_empty() {
                substitute_backrefs(t, captures)
            } else {
                t.clone()
            }
        }
    }
}

/// Replace `$1..$n` literally. Highest index first so `$12` is never
/// clobbered by `$1`.
fn substitute_backrefs(target: &str, captures: &[String]) -> String {
    let mut out = target.to_string();
    for (i, cap) in captures.iter().enumerate().rev() {
        out = out.replace(&format!("${}", i + 1), cap);
    }
    out
}
