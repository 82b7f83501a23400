//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all handler
//! - Wire up middleware layers (tracing, timeout, request ID)
//! - Bind the server to a listener and serve with graceful shutdown
//! - Hand requests to the kernel and translate its responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::request::{subdomain_of, verb_of};
use crate::kernel::Kernel;

/// HTTP server for a kernel.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server around an assembled kernel.
    pub fn new(kernel: Arc<Kernel>) -> Self {
        let timeout = Duration::from_secs(kernel.config().listener.request_timeout_secs);
        let router = Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(kernel)
            .layer(TimeoutLayer::new(timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http());
        Self { router }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every path goes through the kernel.
async fn dispatch_handler(
    State(kernel): State<Arc<Kernel>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let Some(verb) = verb_of(&method) else {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    };

    let subdomain = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(subdomain_of);

    let path = uri.path().to_string();
    tracing::debug!(method = %method, path = %path, "dispatching request");

    // The kernel probes the filesystem; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        kernel.handle(&path, verb, subdomain.as_deref())
    })
    .await;

    match result {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, response.body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "request task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
