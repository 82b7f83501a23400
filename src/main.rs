//! Webby application server.

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use webby::config::AppConfig;
use webby::{app, HttpServer, Kernel};

const CONFIG_FILE: &str = "webby.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config first so the log level is known before the subscriber starts.
    let config = if Path::new(CONFIG_FILE).exists() {
        webby::load_config(Path::new(CONFIG_FILE))?
    } else {
        AppConfig::default()
    };

    webby::observability::init_logging(&config.observability.log_level);
    tracing::info!("webby v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        module_locations = config.routing.module_locations.len(),
        "Configuration loaded"
    );

    let bind_address = config.listener.bind_address.clone();
    let kernel = Kernel::builder(config)
        .routes(app::routes)
        .controllers(app::controllers)
        .middleware(app::middleware)
        .build()?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(Arc::new(kernel));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
