//! Webby — an HMVC web framework core.
//!
//! Modular applications are trees of modules, each carrying its own
//! `Controllers/` (and `Commands/`) directories. Requests flow through a
//! route table, a filesystem-probing module resolver, a middleware
//! pipeline, and finally a singleton controller dispatcher.
//!
//! # Architecture Overview
//!
//! ```text
//! HTTP request / console argv
//!     ┌─────────┐   ┌──────────┐   ┌───────────┐
//!     │  http   │──▶│  kernel  │──▶│  routing  │  table → pattern → matcher
//!     └─────────┘   └────┬─────┘   └─────┬─────┘
//!                        │               ▼
//!                        │         ┌───────────┐
//!                        │         │ resolver  │  module locations, app/core roots
//!                        │         └─────┬─────┘
//!                        ▼               ▼
//!                  ┌────────────┐  ┌───────────┐
//!                  │ middleware │─▶│ dispatch  │  manifest + singleton registry
//!                  └────────────┘  └───────────┘
//!
//!   Cross-cutting: config (TOML schema/loader/validation), observability
//! ```

pub mod app;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod kernel;
pub mod middleware;
pub mod observability;
pub mod routing;

pub use config::{load_config, AppConfig};
pub use http::HttpServer;
pub use kernel::{Kernel, KernelBuilder, Response};
pub use routing::{Routes, Verb};
