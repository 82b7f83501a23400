//! Controller manifest and live-instance registry.
//!
//! # Responsibilities
//! - Map resolved (module, controller) keys to constructor closures
//! - Keep at most one live instance per alias for the process lifetime
//!
//! # Design Decisions
//! - The manifest is populated at boot and read-only afterwards
//! - Aliases are the lower-cased controller basename, so URL casing
//!   variations share one instance

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::Controller;

/// A controller behind the registry's shared handle.
pub type SharedController = Arc<Mutex<Box<dyn Controller>>>;

type Factory = Box<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Boot-time factory table keyed by lower-cased `module/controller`.
#[derive(Default)]
pub struct ControllerManifest {
    factories: HashMap<String, Factory>,
}

impl ControllerManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a module's controller.
    pub fn register<F>(&mut self, module: &str, controller: &str, factory: F)
    where
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        self.factories
            .insert(Self::key(module, controller), Box::new(factory));
    }

    /// Construct a fresh instance, if a factory is registered.
    pub fn construct(&self, module: &str, controller: &str) -> Option<Box<dyn Controller>> {
        self.factories
            .get(&Self::key(module, controller))
            .map(|f| f())
    }

    pub fn contains(&self, module: &str, controller: &str) -> bool {
        self.factories.contains_key(&Self::key(module, controller))
    }

    fn key(module: &str, controller: &str) -> String {
        format!("{}/{}", module.to_lowercase(), controller.to_lowercase())
    }
}

impl std::fmt::Debug for ControllerManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerManifest")
            .field("controllers", &self.factories.len())
            .finish()
    }
}

/// Process-wide singleton map of live controller instances.
#[derive(Default)]
pub struct ControllerRegistry {
    live: DashMap<String, SharedController>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the live instance for an alias, constructing it on first use.
    ///
    /// Returns `None` only when the alias is unknown and `make` produced
    /// no instance.
    pub fn obtain(
        &self,
        alias: &str,
        make: impl FnOnce() -> Option<Box<dyn Controller>>,
    ) -> Option<SharedController> {
        match self.live.entry(alias.to_lowercase()) {
            Entry::Occupied(e) => Some(e.get().clone()),
            Entry::Vacant(v) => {
                let built = make()?;
                Some(v.insert(Arc::new(Mutex::new(built))).clone())
            }
        }
    }

    /// Number of live instances, for diagnostics.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("live", &self.live.len())
            .finish()
    }
}
