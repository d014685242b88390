//! tiny-httpd: a minimal HTTP/1.0 server
//!
//! Features:
//! - Readiness-polled accept loop over a single listening socket
//! - Hand-rolled request parser and response serializer
//! - Method-based handler registry with HTML error pages
//! - Configuration via CLI arguments or TOML file
//!
//! One request is served per connection and connections are served one at
//! a time, in acceptance order.

mod config;
mod http;
mod routes;
mod server;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        timeout_ms = ?config.timeout.map(|t| t.as_millis() as u64),
        max_header_size = config.max_header_size,
        "Starting tiny-httpd"
    );

    let mut server = Server::bind(&config, routes::router())?;
    info!(address = %server.local_addr(), "Serving HTTP");
    server.serve_forever(config.poll_interval)?;
    Ok(())
}
