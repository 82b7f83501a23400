//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, bind address parses)
//! - Check routing settings the resolver depends on
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use super::schema::AppConfig;

/// A single semantic configuration problem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("routing.controller_ext must not be empty")]
    EmptyControllerExt,

    #[error("routing.module_locations[{0}].path must not be empty")]
    EmptyModuleLocation(usize),

    #[error("routing.override_404 must name at least a module segment")]
    EmptyOverride,
}

/// Validate the whole config, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.routing.controller_ext.is_empty() {
        errors.push(ValidationError::EmptyControllerExt);
    }
    for (i, loc) in config.routing.module_locations.iter().enumerate() {
        if loc.path.is_empty() {
            errors.push(ValidationError::EmptyModuleLocation(i));
        }
    }
    if let Some(target) = &config.routing.override_404 {
        if target.split('/').all(|s| s.is_empty()) {
            errors.push(ValidationError::EmptyOverride);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
