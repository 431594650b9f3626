//! # Errores del Servidor
//! src/error.rs
//!
//! - `ServeError`: fallas al atender una conexión. Nunca salen del worker.
//! - `ServerError`: fallas de arranque, fatales para el proceso.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error al procesar una conexión
#[derive(Debug, Error)]
pub enum ServeError {
    /// Lectura/escritura del socket o del archivo
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No se pudo mapear un archivo grande
    #[error("failed to map {}: {source}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No se pudo lanzar el programa CGI
    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// El cliente cerró la conexión antes de recibir la respuesta
    pub fn is_disconnect(&self) -> bool {
        match self {
            ServeError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Error de arranque
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}
