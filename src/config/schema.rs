//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a Webby
//! application. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an application.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Runtime environment; controls error-detail exposure.
    pub environment: Environment,

    /// Listener configuration (bind address, timeouts).
    pub listener: ListenerConfig,

    /// Routing and module-resolution settings.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// One module location probed by the resolver, in priority order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleLocationConfig {
    /// Filesystem root holding module directories.
    pub path: String,

    /// URL-segment offset recorded for directory bookkeeping.
    #[serde(default)]
    pub offset: String,
}

/// Routing and module-resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Module roots, first match wins.
    pub module_locations: Vec<ModuleLocationConfig>,

    /// Application root holding the top-level Controllers/Commands trees.
    pub app_root: String,

    /// Core root holding the built-in controllers fallback tree.
    pub core_root: String,

    /// Controller source-file extension probed on disk.
    pub controller_ext: String,

    /// Target dispatched when resolution misses (e.g. "errors/show404").
    pub override_404: Option<String>,

    /// Cache resolutions for the process lifetime. Off by default:
    /// entries go stale when the controller tree changes.
    pub cache_resolutions: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            module_locations: vec![ModuleLocationConfig {
                path: "modules".to_string(),
                offset: "../modules/".to_string(),
            }],
            app_root: "app".to_string(),
            core_root: "core".to_string(),
            controller_ext: "php".to_string(),
            override_404: None,
            cache_resolutions: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
