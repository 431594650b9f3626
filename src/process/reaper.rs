//! # Reaper de Procesos CGI
//! src/process/reaper.rs
//!
//! Los workers lanzan el programa CGI y vuelven al pool sin esperarlo. El
//! `Child` queda registrado en `ChildRegistry` y un thread dedicado lo
//! recolecta cuando termina, para que no quede como zombie.
//!
//! ```text
//! worker ──spawn──▶ ChildRegistry ◀──try_wait── reaper
//!                        ▲                         ▲
//!                        └── notify() ◀── SIGCHLD ─┘ (o timeout del poll)
//! ```
//!
//! El reaper nunca bloquea esperando a un hijo: solo usa `try_wait`.

use crate::metrics::MetricsCollector;
use std::io;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Por qué despertó el reaper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Llegó una notificación (SIGCHLD)
    Notified,
    /// Venció el intervalo de poll
    Timeout,
    /// Se pidió detener el reaper
    Shutdown,
}

/// Hijo recolectado
#[derive(Debug, Clone, Copy)]
pub struct Reaped {
    pub pid: u32,
    pub status: ExitStatus,
}

#[derive(Default)]
struct RegistryState {
    children: Vec<Child>,
    notified: bool,
    shutdown: bool,
}

/// Procesos CGI lanzados que todavía no fueron recolectados
#[derive(Default)]
pub struct ChildRegistry {
    state: Mutex<RegistryState>,
    wakeup: Condvar,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un hijo recién lanzado
    pub fn register(&self, child: Child) {
        debug!(pid = child.id(), "registered child process");
        self.lock().children.push(child);
    }

    /// Hijos registrados que aún no terminaron (o no fueron revisados)
    pub fn pending(&self) -> usize {
        self.lock().children.len()
    }

    /// Despierta al reaper (se llama al recibir SIGCHLD)
    pub fn notify(&self) {
        self.lock().notified = true;
        self.wakeup.notify_all();
    }

    /// Pide al reaper que termine
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.wakeup.notify_all();
    }

    /// Espera una notificación o hasta `timeout`
    pub fn wait(&self, timeout: Duration) -> Wake {
        let state = self.lock();
        let (mut state, _) = self
            .wakeup
            .wait_timeout_while(state, timeout, |s| !s.notified && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);

        if state.shutdown {
            Wake::Shutdown
        } else if state.notified {
            state.notified = false;
            Wake::Notified
        } else {
            Wake::Timeout
        }
    }

    /// Recolecta todos los hijos que ya terminaron, sin bloquear.
    ///
    /// Un `try_wait` interrumpido se reintenta; cualquier otro error se
    /// registra y el hijo se abandona.
    pub fn reap_terminated(&self) -> Vec<Reaped> {
        let mut state = self.lock();
        let mut reaped = Vec::new();
        let mut i = 0;

        while i < state.children.len() {
            match state.children[i].try_wait() {
                Ok(Some(status)) => {
                    let child = state.children.swap_remove(i);
                    reaped.push(Reaped {
                        pid: child.id(),
                        status,
                    });
                }
                Ok(None) => i += 1,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let child = state.children.swap_remove(i);
                    warn!(pid = child.id(), error = %e, "waitpid failed, abandoning child");
                }
            }
        }

        reaped
    }
}

/// Thread que recolecta los procesos CGI terminados
pub struct Reaper {
    registry: Arc<ChildRegistry>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Inicia el reaper.
    ///
    /// Despierta con cada `notify()` del registry y, como respaldo, cada
    /// `poll_interval`.
    pub fn spawn(
        registry: Arc<ChildRegistry>,
        metrics: MetricsCollector,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new().name("reaper".to_string()).spawn({
            let registry = Arc::clone(&registry);
            move || Self::run(&registry, &metrics, poll_interval)
        })?;

        Ok(Self { registry, handle })
    }

    fn run(registry: &ChildRegistry, metrics: &MetricsCollector, poll_interval: Duration) {
        info!(poll_ms = poll_interval.as_millis() as u64, "reaper started");

        loop {
            let wake = registry.wait(poll_interval);

            for reaped in registry.reap_terminated() {
                info!(
                    pid = reaped.pid,
                    exit_code = ?reaped.status.code(),
                    "reaped a child process"
                );
                metrics.record_reap(reaped.pid, reaped.status.code());
            }

            if wake == Wake::Shutdown {
                break;
            }
        }

        info!("reaper stopped");
    }

    pub fn registry(&self) -> &Arc<ChildRegistry> {
        &self.registry
    }

    /// Detiene el reaper y espera a que termine
    pub fn stop(self) {
        self.registry.shutdown();
        if self.handle.join().is_err() {
            warn!("reaper thread panicked");
        }
    }
}
