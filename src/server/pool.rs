//! # Pool de Workers
//! src/server/pool.rs
//!
//! N threads de larga vida creados una sola vez al inicio. Cada uno repite:
//! sacar una conexión de la cola, procesarla y cerrarla. Si la cola está
//! vacía el worker queda bloqueado en `dequeue` sin consumir CPU.

use crate::queue::BoundedQueue;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Conjunto fijo de workers que consumen una `BoundedQueue`
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Inicia `size` workers que aplican `handler` a cada item de `queue`.
    ///
    /// Los workers terminan solo cuando la cola se cierra.
    pub fn spawn<T, F>(size: usize, queue: BoundedQueue<T>, handler: F) -> io::Result<Self>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut handles = Vec::with_capacity(size);

        for i in 0..size {
            let queue = queue.clone();
            let handler = Arc::clone(&handler);

            let handle = thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn(move || Self::worker_loop(i, queue, handler))?;
            handles.push(handle);
        }

        Ok(Self { handles })
    }

    /// Loop principal del worker
    fn worker_loop<T, F>(id: usize, queue: BoundedQueue<T>, handler: Arc<F>)
    where
        F: Fn(T),
    {
        debug!(worker = id, "worker started");

        while let Some(item) = queue.dequeue() {
            // Un panic pierde solo esta conexión; el worker sigue vivo
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (*handler)(item))) {
                error!(
                    worker = id,
                    panic = panic_message(payload.as_ref()),
                    "handler panicked, connection dropped"
                );
            }
        }

        debug!(worker = id, "queue closed, worker exiting");
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Espera a que todos los workers terminen (requiere cerrar la cola antes)
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
