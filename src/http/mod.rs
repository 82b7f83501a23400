//! HTTP front subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (verb mapping, subdomain extraction)
//!     → kernel (route, resolve, dispatch)
//!     → Response { status, body } sent to client
//! ```

pub mod request;
pub mod server;

pub use request::{subdomain_of, verb_of};
pub use server::HttpServer;
