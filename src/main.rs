//! # tiny_httpd - Entry Point
//! src/main.rs
//!
//! ```bash
//! tiny_httpd <PORT> [--workers N] [--queue-capacity C] [--root DIR]
//! ```

use anyhow::Context;
use tiny_httpd::config::Config;
use tiny_httpd::process::signals;
use tiny_httpd::server::Server;
use tiny_httpd::telemetry;

fn main() -> anyhow::Result<()> {
    // Un puerto faltante o inválido termina aquí con el uso de clap
    let config = Config::new();

    telemetry::init();
    config.print_summary();

    let server = Server::bind(config)?;
    signals::spawn(server.queue(), server.registry(), server.metrics())
        .context("failed to install signal handlers")?;

    server.serve().context("accept loop failed")?;
    Ok(())
}
