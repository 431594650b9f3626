//! # Contenido Dinámico (CGI)
//! src/server/dynamic.rs
//!
//! El worker escribe la status line y el header `Server`, lanza el
//! ejecutable con `QUERY_STRING` en su entorno y su stdout apuntando al
//! socket, y vuelve al pool sin esperarlo. El programa escribe el resto
//! de los headers, la línea vacía y el body. El reaper recolecta el proceso.

use crate::error::ServeError;
use crate::http::{Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::process::ChildRegistry;
use std::io::Write;
use std::net::TcpStream;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// Variable de entorno con los argumentos del programa
pub const QUERY_ENV: &str = "QUERY_STRING";

/// Lanza `program` con `query` en `QUERY_STRING` y stdout en `stdout`.
///
/// stdin queda en `/dev/null`; stderr se hereda del servidor.
pub fn spawn_cgi(program: &Path, query: &str, stdout: impl Into<Stdio>) -> Result<Child, ServeError> {
    Command::new(program)
        .env(QUERY_ENV, query)
        .stdin(Stdio::null())
        .stdout(stdout)
        .spawn()
        .map_err(|source| ServeError::Spawn {
            path: program.to_path_buf(),
            source,
        })
}

/// Sirve una request dinámica sobre `stream`.
///
/// Retorna apenas el hijo quedó lanzado y registrado.
pub fn serve(
    stream: &TcpStream,
    program: &Path,
    query: &str,
    registry: &ChildRegistry,
    metrics: &MetricsCollector,
) -> Result<(), ServeError> {
    let mut writer = stream;
    writer.write_all(&Response::new(StatusCode::Ok).head())?;
    writer.flush()?;

    // El hijo recibe su propio descriptor del socket. El nuestro se cierra
    // al terminar el worker; la conexión sigue abierta hasta que el hijo sale.
    let socket = OwnedFd::from(stream.try_clone()?);
    let child = spawn_cgi(program, query, socket)?;

    debug!(pid = child.id(), program = %program.display(), query, "spawned CGI program");
    metrics.record_spawn();
    registry.register(child);

    Ok(())
}
