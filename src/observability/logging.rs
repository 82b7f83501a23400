//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Respect `RUST_LOG` over the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Log level comes from config but the environment wins

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber with the configured level.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("webby={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
