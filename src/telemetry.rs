//! # Logging
//! src/telemetry.rs
//!
//! Subscriber de `tracing` para todo el proceso. El nivel se controla con
//! `RUST_LOG` (por defecto `info`).
//!
//! Acceptor, workers, reaper y el thread de señales escriben por el mismo
//! `Mutex<Stderr>`, así que cada evento sale completo en su propia línea.

use std::io;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Instala el subscriber global.
///
/// Llamarla más de una vez (por ejemplo desde tests) no tiene efecto.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .with_writer(Mutex::new(io::stderr()))
        .try_init();
}
