//! Module resolution.
//!
//! # Data Flow
//! ```text
//! Rewritten segments [module, directory?, controller?, ...]
//!     → reserved-name check (Controllers/Commands aliases)
//!     → module-location loop (priority order, first hit wins)
//!         deep sub-directory probes before shallow ones
//!     → secondary fallback ladder (app root, then core tree)
//!     → LocateOutcome: matched target, explicit miss, or unresolved
//! ```
//!
//! # Design Decisions
//! - The probe order is load-bearing: applications override by presence,
//!   a file at a higher-priority location shadows one below it
//! - Locate state is a tagged enum carrying the matched data, never a
//!   bare integer flag
//! - Misses are expected control flow and log at debug only
//! - Resolution caching is opt-in; the original probes the filesystem on
//!   every request and cache entries go stale when the tree changes

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use super::{studly, RequestKind};

/// One filesystem root probed for module directories.
///
/// Order in the resolver's list defines probe priority; the offset is the
/// URL-segment prefix recorded for directory bookkeeping.
#[derive(Debug, Clone)]
pub struct ModuleLocation {
    pub path: PathBuf,
    pub offset: String,
}

/// How deep the resolver matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchDepth {
    /// Controller found at a root controllers directory.
    Root,
    /// Self-named or direct controller inside the module directory.
    TopLevel,
    /// Controller file named after the sub-directory segment.
    SubDir,
    /// Controller file inside a sub-directory.
    SubSubDir,
}

impl MatchDepth {
    /// Numeric depth, matching the 0..3 classification.
    pub fn level(&self) -> u8 {
        match self {
            MatchDepth::Root => 0,
            MatchDepth::TopLevel => 1,
            MatchDepth::SubDir => 2,
            MatchDepth::SubSubDir => 3,
        }
    }

    /// Leading segments consumed by the match; the rest go to dispatch.
    fn consumed(&self) -> usize {
        match self {
            MatchDepth::Root | MatchDepth::TopLevel => 0,
            MatchDepth::SubDir => 1,
            MatchDepth::SubSubDir => 2,
        }
    }
}

/// A fully resolved dispatch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub module: String,
    /// Directory bookkeeping path (location offset + consumed directories).
    pub directory: String,
    pub controller: String,
    pub depth: MatchDepth,
    /// Trailing segments handed to the dispatcher (controller, method, args).
    pub remaining: Vec<String>,
}

/// Outcome of a locate walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateOutcome {
    /// Nothing matched anywhere; the caller applies 404-override routing.
    Unresolved,
    /// A module owned the path but the named sub-directory target was
    /// absent; terminal, no shallower or later probes run.
    ExplicitMiss,
    Matched(ResolvedTarget),
}

/// Resolves URI segments to controllers across configured module roots.
pub struct ModuleResolver {
    locations: Vec<ModuleLocation>,
    app_root: PathBuf,
    core_root: PathBuf,
    ext: String,
    cache: Option<DashMap<(RequestKind, Vec<String>), LocateOutcome>>,
}

impl ModuleResolver {
    pub fn new(
        locations: Vec<ModuleLocation>,
        app_root: impl Into<PathBuf>,
        core_root: impl Into<PathBuf>,
        ext: impl Into<String>,
    ) -> Self {
        Self {
            locations,
            app_root: app_root.into(),
            core_root: core_root.into(),
            ext: ext.into(),
            cache: None,
        }
    }

    /// Enable the process-lifetime resolution cache.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(DashMap::new());
        self
    }

    /// Locate the controller for the given segments.
    pub fn locate(&self, segments: &[String], kind: RequestKind) -> LocateOutcome {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&(kind, segments.to_vec())) {
                return hit.clone();
            }
        }

        let outcome = self.locate_uncached(segments, kind);

        if let Some(cache) = &self.cache {
            cache.insert((kind, segments.to_vec()), outcome.clone());
        }
        outcome
    }

    fn locate_uncached(&self, segments: &[String], kind: RequestKind) -> LocateOutcome {
        let mut kind = kind;
        let mut segs: Vec<String> = segments.to_vec();

        // Reserved directory names route straight to the app/core trees,
        // bypassing module lookup.
        let reserved = matches!(
            segs.first().map(String::as_str),
            Some("Controllers") | Some("Commands")
        );
        if reserved {
            kind = if segs[0] == "Commands" {
                RequestKind::Cli
            } else {
                RequestKind::Web
            };
            segs.remove(0);
        }
        while segs.len() < 3 {
            segs.push(String::new());
        }

        let module = studly(&segs[0]);
        let directory = normalize_directory(&segs[1]);
        let controller = studly(&segs[2]);

        if !reserved {
            for location in &self.locations {
                let source = location.path.join(&module).join(kind.dir_name());
                if !source.is_dir() {
                    continue;
                }
                let offset_dir =
                    format!("{}{}/{}/", location.offset, module, kind.dir_name());

                if !directory.is_empty() {
                    match self.probe_subdirectory(
                        &source,
                        &offset_dir,
                        &module,
                        &directory,
                        &controller,
                        &segs,
                    ) {
                        Some(outcome) => return outcome,
                        None => {
                            // A directory segment was given and nothing
                            // matched under this module: explicit miss,
                            // no fall-through to shallower probes.
                            tracing::debug!(
                                module = %module,
                                directory = %directory,
                                "explicit miss in module location"
                            );
                            return LocateOutcome::ExplicitMiss;
                        }
                    }
                }

                // Self-named module controller, then a direct controller
                // segment (the Commands single-file form).
                if source.join(self.file_name(&module)).is_file() {
                    return self.matched(
                        MatchDepth::TopLevel,
                        &module,
                        &offset_dir,
                        &module,
                        &segs,
                    );
                }
                if !controller.is_empty()
                    && source.join(self.file_name(&controller)).is_file()
                {
                    return self.matched(
                        MatchDepth::TopLevel,
                        &module,
                        &offset_dir,
                        &controller,
                        &segs,
                    );
                }
            }
        }

        self.locate_fallback(kind, &module, &directory, &controller, &segs)
    }

    /// Deep probes for a module that owns a directory segment, deepest
    /// first. `None` means explicit miss.
    fn probe_subdirectory(
        &self,
        source: &Path,
        offset_dir: &str,
        module: &str,
        directory: &str,
        controller: &str,
        segs: &[String],
    ) -> Option<LocateOutcome> {
        let sub = source.join(directory);

        if !controller.is_empty() && sub.join(self.file_name(controller)).is_file() {
            return Some(self.matched(
                MatchDepth::SubSubDir,
                module,
                &format!("{offset_dir}{directory}/"),
                controller,
                segs,
            ));
        }
        // Sub-directory with a controller named after it.
        if sub.is_dir() && sub.join(self.file_name(directory)).is_file() {
            return Some(self.matched(
                MatchDepth::SubSubDir,
                module,
                &format!("{offset_dir}{directory}/"),
                directory,
                segs,
            ));
        }
        // The directory segment is itself a controller file.
        if source.join(self.file_name(directory)).is_file() {
            return Some(self.matched(
                MatchDepth::SubDir,
                module,
                offset_dir,
                directory,
                segs,
            ));
        }
        None
    }

    /// Fixed secondary search order over the app root and the core tree.
    fn locate_fallback(
        &self,
        kind: RequestKind,
        module: &str,
        directory: &str,
        controller: &str,
        segs: &[String],
    ) -> LocateOutcome {
        let app = self.app_root.join(kind.dir_name());
        let core = self.core_root.join("controllers");

        if !directory.is_empty()
            && !controller.is_empty()
            && app
                .join(module)
                .join(directory)
                .join(self.file_name(controller))
                .is_file()
        {
            return self.matched(
                MatchDepth::SubSubDir,
                module,
                &format!("{}/{module}/{directory}/", kind.dir_name()),
                controller,
                segs,
            );
        }

        if core.join("Commands").join(self.file_name(module)).is_file() {
            return self.matched(
                MatchDepth::Root,
                module,
                "controllers/Commands/",
                module,
                segs,
            );
        }

        if app.join(module).is_dir() {
            let controller = if directory.is_empty() { module } else { directory };
            return self.matched(
                MatchDepth::TopLevel,
                module,
                &format!("{}/{module}/", kind.dir_name()),
                controller,
                segs,
            );
        }

        if app.join(self.file_name(module)).is_file() {
            return self.matched(
                MatchDepth::Root,
                module,
                &format!("{}/", kind.dir_name()),
                module,
                segs,
            );
        }

        if core.join(module).is_dir() {
            let controller = if directory.is_empty() { module } else { directory };
            return self.matched(
                MatchDepth::TopLevel,
                module,
                &format!("controllers/{module}/"),
                controller,
                segs,
            );
        }

        if core.join(self.file_name(module)).is_file() {
            return self.matched(MatchDepth::Root, module, "controllers/", module, segs);
        }

        tracing::debug!(module = %module, "module unresolved");
        LocateOutcome::Unresolved
    }

    fn matched(
        &self,
        depth: MatchDepth,
        module: &str,
        directory: &str,
        controller: &str,
        segs: &[String],
    ) -> LocateOutcome {
        let remaining = segs[depth.consumed()..].to_vec();
        tracing::debug!(
            module = %module,
            controller = %controller,
            depth = depth.level(),
            "module resolved"
        );
        LocateOutcome::Matched(ResolvedTarget {
            module: module.to_string(),
            directory: directory.to_string(),
            controller: controller.to_string(),
            depth,
            remaining,
        })
    }

    fn file_name(&self, name: &str) -> String {
        format!("{}.{}", name, self.ext)
    }
}

/// Directory-segment normalization: any segment containing "command"
/// (case-insensitive) is rewritten to the canonical `Command`; everything
/// else is studly-cased like a controller file name.
fn normalize_directory(segment: &str) -> String {
    if segment.is_empty() {
        return String::new();
    }
    if segment.to_lowercase().contains("command") {
        return "Command".to_string();
    }
    studly(segment)
}
