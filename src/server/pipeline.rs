//! # Pipeline de una Request
//! src/server/pipeline.rs
//!
//! Procesa una conexión de principio a fin, en orden lineal:
//!
//! ```text
//! request line ──▶ método GET? ──no──▶ 501
//!      │
//!      ▼
//! descartar headers ──▶ resolver target ──`..`──▶ 404
//!      │
//!      ▼
//! stat ──no existe──▶ 404
//!      │──estático no legible / CGI no ejecutable──▶ 403
//!      ▼
//! static_files::serve | dynamic::serve
//! ```
//!
//! Las páginas de error reemplazan por completo al procesamiento normal.

use crate::error::ServeError;
use crate::http::request::{self, ParseError, RequestLine};
use crate::http::{ResolveError, Response, StatusCode, Target};
use crate::metrics::MetricsCollector;
use crate::process::ChildRegistry;
use crate::server::{dynamic, static_files};
use std::fs;
use std::io::{self, BufReader, Read};
use std::net::{Shutdown, TcpStream};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bit de lectura del dueño (S_IRUSR)
const OWNER_READ: u32 = 0o400;

/// Bit de ejecución del dueño (S_IXUSR)
const OWNER_EXEC: u32 = 0o100;

/// Bytes sin leer que se descartan antes de cerrar la conexión
const MAX_DRAIN: u64 = 1024 * 1024;

/// Espera máxima por lectura al descartar la entrada sobrante
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Resultado de una request que recibió respuesta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Target pedido (o lo que haya en su lugar si la línea era inválida)
    pub target: String,
    pub status: StatusCode,
}

/// Estado compartido por todos los workers para atender requests
#[derive(Clone)]
pub struct Pipeline {
    doc_root: PathBuf,
    cgi_dir: String,
    registry: Arc<ChildRegistry>,
    metrics: MetricsCollector,
}

impl Pipeline {
    pub fn new(
        doc_root: impl Into<PathBuf>,
        cgi_dir: impl Into<String>,
        registry: Arc<ChildRegistry>,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            doc_root: doc_root.into(),
            cgi_dir: cgi_dir.into(),
            registry,
            metrics,
        }
    }

    /// Atiende una conexión y la cierra.
    ///
    /// Los errores quedan en el log y en las métricas; nunca se propagan.
    pub fn handle(&self, stream: TcpStream) {
        let start = Instant::now();
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        match self.process(&stream) {
            Ok(Some(exchange)) => {
                let latency = start.elapsed();
                info!(
                    peer = %peer,
                    target = %exchange.target,
                    status = exchange.status.as_u16(),
                    latency_ms = latency.as_secs_f64() * 1000.0,
                    "request served"
                );
                self.metrics.record_request(exchange.status.as_u16(), latency);
            }
            Ok(None) => {
                debug!(peer = %peer, "connection closed without a request line");
            }
            Err(e) if e.is_disconnect() => {
                debug!(peer = %peer, error = %e, "client went away");
                self.metrics.record_transport_error();
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "request aborted");
                self.metrics.record_transport_error();
            }
        }
        // `stream` se cierra aquí
    }

    /// Lee la request, la resuelve y escribe la respuesta.
    ///
    /// Retorna `None` si el cliente no envió una request line.
    pub fn process(&self, stream: &TcpStream) -> Result<Option<Exchange>, ServeError> {
        let mut reader = BufReader::new(stream);
        let mut writer = stream;

        let line = match request::read_line(&mut reader)? {
            Some(line) => line,
            None => return Ok(None),
        };
        debug!(request_line = line.trim_end(), "request line");

        let request = match RequestLine::parse(&line) {
            Ok(request) => request,
            Err(ParseError::Empty) => return Ok(None),
            Err(ParseError::UnsupportedMethod(method)) => {
                let target = line.split_whitespace().nth(1).unwrap_or("-");
                return reject(
                    &mut writer,
                    target,
                    StatusCode::NotImplemented,
                    &method,
                    "tiny_httpd does not implement this method",
                );
            }
            Err(ParseError::Malformed(raw)) => {
                return reject(
                    &mut writer,
                    "-",
                    StatusCode::BadRequest,
                    &raw,
                    "malformed request line",
                );
            }
        };

        let headers = request::consume_headers(&mut reader)?;
        debug!(headers, "request headers discarded");

        let target = match Target::resolve(request.target(), &self.doc_root, &self.cgi_dir) {
            Ok(target) => target,
            Err(ResolveError::Traversal(raw)) => {
                warn!(target = %raw, "rejected parent-directory traversal");
                return reject(
                    &mut writer,
                    request.target(),
                    StatusCode::NotFound,
                    &raw,
                    "tiny_httpd couldn't find this file",
                );
            }
        };

        let path_display = target.path().display().to_string();
        let metadata = match fs::metadata(target.path()) {
            Ok(metadata) => metadata,
            Err(_) => {
                return reject(
                    &mut writer,
                    request.target(),
                    StatusCode::NotFound,
                    &path_display,
                    "tiny_httpd couldn't find this file",
                );
            }
        };
        let mode = metadata.permissions().mode();

        match &target {
            Target::Static { path } => {
                if !metadata.is_file() || mode & OWNER_READ == 0 {
                    return reject(
                        &mut writer,
                        request.target(),
                        StatusCode::Forbidden,
                        &path_display,
                        "tiny_httpd couldn't read the file",
                    );
                }
                static_files::serve(&mut writer, path, metadata.len())?;
                linger_close(stream);
            }
            Target::Dynamic { path, query } => {
                if !metadata.is_file() || mode & OWNER_EXEC == 0 {
                    return reject(
                        &mut writer,
                        request.target(),
                        StatusCode::Forbidden,
                        &path_display,
                        "tiny_httpd couldn't run the CGI program",
                    );
                }
                dynamic::serve(stream, path, query, &self.registry, &self.metrics)?;
            }
        }

        Ok(Some(Exchange {
            target: request.target().to_string(),
            status: StatusCode::Ok,
        }))
    }
}

/// Escribe una página de error y termina el pipeline
fn reject(
    writer: &mut &TcpStream,
    target: &str,
    status: StatusCode,
    cause: &str,
    message: &str,
) -> Result<Option<Exchange>, ServeError> {
    Response::client_error(status, cause, message).write_to(writer)?;
    linger_close(*writer);

    Ok(Some(Exchange {
        target: target.to_string(),
        status,
    }))
}

/// Cierra el lado de escritura y descarta lo que el cliente siga enviando.
///
/// Cerrar con bytes sin leer hace que el kernel responda con RST, y el
/// cliente puede perder la respuesta ya enviada. Solo se usa cuando la
/// respuesta la escribió el worker: con CGI el socket sigue abierto en el hijo.
fn linger_close(stream: &TcpStream) {
    if stream.shutdown(Shutdown::Write).is_err() {
        return;
    }
    if stream.set_read_timeout(Some(DRAIN_TIMEOUT)).is_err() {
        return;
    }

    let mut input = stream;
    match io::copy(&mut input.by_ref().take(MAX_DRAIN), &mut io::sink()) {
        Ok(drained) if drained > 0 => debug!(drained, "discarded unread request bytes"),
        Ok(_) => {}
        Err(e) => debug!(error = %e, "stopped draining request input"),
    }
}
