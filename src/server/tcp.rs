//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El thread principal solo acepta conexiones y las deposita en la cola
//! acotada; un pool fijo de workers las procesa. Si la cola está llena el
//! acceptor se bloquea y las conexiones nuevas esperan en el backlog del
//! kernel (backpressure).
//!
//! ```text
//! accept ──▶ BoundedQueue<TcpStream> ──▶ worker-0..N ──▶ Pipeline
//!                                                          │
//!                                  ChildRegistry ◀── CGI ──┘
//!                                        │
//!                                      reaper
//! ```

use crate::config::Config;
use crate::error::ServerError;
use crate::metrics::MetricsCollector;
use crate::process::{ChildRegistry, Reaper};
use crate::queue::BoundedQueue;
use crate::server::pipeline::Pipeline;
use crate::server::pool::WorkerPool;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Servidor HTTP/1.0 con pool de workers
pub struct Server {
    config: Config,
    listener: TcpListener,
    queue: BoundedQueue<TcpStream>,
    registry: Arc<ChildRegistry>,
    metrics: MetricsCollector,
}

impl Server {
    /// Valida la configuración y abre el socket de escucha.
    ///
    /// Workers y reaper no arrancan hasta `serve`.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::InvalidConfig)?;

        let address = config.address();
        let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind {
            addr: address.clone(),
            source,
        })?;
        info!(address = %address, "listening");

        Ok(Self {
            queue: BoundedQueue::new(config.queue_capacity),
            registry: Arc::new(ChildRegistry::new()),
            metrics: MetricsCollector::new(),
            listener,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle de la cola; cerrarla detiene acceptor y workers
    pub fn queue(&self) -> BoundedQueue<TcpStream> {
        self.queue.clone()
    }

    pub fn registry(&self) -> Arc<ChildRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    /// Arranca reaper y workers y corre el loop de accept.
    ///
    /// Retorna cuando la cola se cierra; en ese caso detiene los workers
    /// y el reaper antes de salir.
    pub fn serve(self) -> io::Result<()> {
        let reaper = Reaper::spawn(
            Arc::clone(&self.registry),
            self.metrics.clone(),
            Duration::from_millis(self.config.reap_interval_ms),
        )?;

        let pipeline = Pipeline::new(
            self.config.root.clone(),
            self.config.cgi_dir.clone(),
            Arc::clone(&self.registry),
            self.metrics.clone(),
        );
        let metrics = self.metrics.clone();
        let pool = WorkerPool::spawn(self.config.workers, self.queue.clone(), move |stream| {
            let _busy = metrics.worker_busy();
            pipeline.handle(stream);
        })?;
        info!(
            workers = pool.size(),
            queue_capacity = self.queue.capacity(),
            "worker pool ready"
        );

        self.accept_loop();

        pool.join();
        reaper.stop();
        info!("server stopped");
        Ok(())
    }

    fn accept_loop(&self) {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            if let Ok(peer) = stream.peer_addr() {
                debug!(peer = %peer, queued = self.queue.len(), "connection accepted");
            }
            self.metrics.record_accept();

            // Bloquea mientras la cola esté llena
            if self.queue.enqueue(stream).is_err() {
                info!("queue closed, accept loop exiting");
                break;
            }
        }
    }
}
