//! # Manejo de Señales
//! src/process/signals.rs
//!
//! Un thread dedicado recibe las señales del proceso con `signal-hook`:
//!
//! - `SIGCHLD`: despierta al reaper.
//! - `SIGINT`, `SIGTERM`, `SIGQUIT`: cierra la cola (libera las conexiones
//!   pendientes), deja el snapshot de métricas en el log y termina el
//!   proceso. Las requests en curso no se esperan.
//!
//! `SIGPIPE` no se maneja aquí: el runtime de Rust lo ignora antes de
//! `main`, así que un cliente que corta la conexión solo produce un
//! `BrokenPipe` en la escritura.

use crate::metrics::MetricsCollector;
use crate::process::ChildRegistry;
use crate::queue::BoundedQueue;
use signal_hook::consts::{SIGCHLD, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::info;

/// Señales que atiende el servidor
pub const HANDLED: [i32; 4] = [SIGCHLD, SIGINT, SIGTERM, SIGQUIT];

/// Nombre legible de las señales que escuchamos
pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGCHLD => "SIGCHLD",
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGQUIT => "SIGQUIT",
        _ => "unknown",
    }
}

/// Instala los handlers de `HANDLED` e inicia el thread de señales
pub fn spawn<T: Send + 'static>(
    queue: BoundedQueue<T>,
    registry: Arc<ChildRegistry>,
    metrics: MetricsCollector,
) -> io::Result<JoinHandle<()>> {
    spawn_with(&HANDLED, queue, registry, metrics)
}

/// Igual que `spawn`, pero escuchando solo `signals`
pub fn spawn_with<T: Send + 'static>(
    signals: &[i32],
    queue: BoundedQueue<T>,
    registry: Arc<ChildRegistry>,
    metrics: MetricsCollector,
) -> io::Result<JoinHandle<()>> {
    let mut signals = Signals::new(signals)?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if signal == SIGCHLD {
                    registry.notify();
                    continue;
                }

                info!(signal = signal_name(signal), "termination signal received, shutting down");
                shutdown(&queue, &registry, &metrics);
                std::process::exit(0);
            }
        })
}

/// Libera la cola y detiene el reaper, dejando las métricas en el log.
///
/// Retorna cuántas conexiones pendientes se descartaron.
pub fn shutdown<T>(
    queue: &BoundedQueue<T>,
    registry: &ChildRegistry,
    metrics: &MetricsCollector,
) -> usize {
    let discarded = queue.close();
    registry.shutdown();
    info!(
        discarded_connections = discarded,
        metrics = %metrics.to_json(),
        "bounded queue released"
    );
    discarded
}
