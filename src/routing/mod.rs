//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request URI + verb (or console argv)
//!     → table.rs (route table, built fresh at boot by app route files)
//!     → pattern.rs (compile placeholder/wildcard keys to anchored regexes)
//!     → matcher.rs (insertion-order walk, first match rewrites segments)
//!     → resolver.rs (probe module locations for the final controller)
//!     → Return: ResolvedTarget or explicit miss
//! ```
//!
//! # Design Decisions
//! - Route tables are rebuilt per process start and immutable afterwards
//! - First-registered route wins on overlapping patterns
//! - Literal patterns never touch the regex engine
//! - Resolution misses are control flow, logged at debug only

pub mod matcher;
pub mod pattern;
pub mod resolver;
pub mod table;

pub use matcher::{MatchResult, RouteMatcher};
pub use pattern::{compile, CompiledPattern, RouteError};
pub use resolver::{LocateOutcome, MatchDepth, ModuleLocation, ModuleResolver, ResolvedTarget};
pub use table::{Route, RouteTarget, Routes};

/// HTTP verbs plus the console pseudo-verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Cli,
}

impl Verb {
    /// Lower-cased wire name, used for logging and legacy verb-keyed routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::Head => "head",
            Verb::Options => "options",
            Verb::Cli => "cli",
        }
    }

    /// Parse a verb name case-insensitively.
    pub fn parse(s: &str) -> Option<Verb> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Verb::Get),
            "post" => Some(Verb::Post),
            "put" => Some(Verb::Put),
            "patch" => Some(Verb::Patch),
            "delete" => Some(Verb::Delete),
            "head" => Some(Verb::Head),
            "options" => Some(Verb::Options),
            "cli" => Some(Verb::Cli),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which controller directory family a request resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Web requests resolve against `Controllers/` directories.
    Web,
    /// Console invocations resolve against `Commands/` directories.
    Cli,
}

impl RequestKind {
    /// The reserved directory name probed for this request kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            RequestKind::Web => "Controllers",
            RequestKind::Cli => "Commands",
        }
    }
}

/// Split a URI into non-empty segments, trimming leading/trailing slashes.
pub fn normalize_uri(uri: &str) -> Vec<String> {
    uri.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Join segments back into the normalized URI string matched against patterns.
pub fn join_segments(segments: &[String]) -> String {
    segments.join("/")
}

/// Upper-case the first ASCII letter, as controller file names are cased.
pub fn studly(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uri_trims_slashes() {
        assert_eq!(normalize_uri("/users/42/"), vec!["users", "42"]);
        assert_eq!(normalize_uri("users//42"), vec!["users", "42"]);
        assert!(normalize_uri("/").is_empty());
        assert!(normalize_uri("").is_empty());
    }

    #[test]
    fn test_verb_parse_is_case_insensitive() {
        assert_eq!(Verb::parse("GET"), Some(Verb::Get));
        assert_eq!(Verb::parse("Patch"), Some(Verb::Patch));
        assert_eq!(Verb::parse("cli"), Some(Verb::Cli));
        assert_eq!(Verb::parse("teapot"), None);
    }

    #[test]
    fn test_studly() {
        assert_eq!(studly("books"), "Books");
        assert_eq!(studly("Books"), "Books");
        assert_eq!(studly(""), "");
    }
}
