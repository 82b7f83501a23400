//! Shared fixtures for integration tests.
//!
//! Tests build a throwaway module tree on disk, since resolution probes
//! the filesystem, then drive requests through a fully assembled kernel.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use webby::config::AppConfig;
use webby::dispatch::{Controller, Invocation, OutputBuffer};

/// Create the file and any missing parent directories.
pub fn touch(base: &Path, relative: &str) {
    let path = base.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

/// A default config whose module roots live under the tempdir.
pub fn config_for(tmp: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.routing.module_locations[0].path =
        tmp.path().join("modules").to_string_lossy().into_owned();
    config.routing.app_root = tmp.path().join("app").to_string_lossy().into_owned();
    config.routing.core_root = tmp.path().join("core").to_string_lossy().into_owned();
    config
}

/// A controller that echoes its method and arguments.
pub struct Echo {
    pub middlewares: Vec<String>,
}

impl Echo {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self { middlewares: Vec::new() }
    }
}

impl Controller for Echo {
    fn invoke(&mut self, method: &str, args: &[String], out: &mut OutputBuffer) -> Invocation {
        out.write(&format!("{method}({})", args.join(",")));
        Invocation::Buffered
    }

    fn middleware(&self) -> Vec<String> {
        self.middlewares.clone()
    }
}
