//! # Servidor de Archivos Estáticos
//! src/server/static_files.rs
//!
//! Envía un archivo regular ya validado (existe y es legible):
//!
//! 1. Tipo MIME según la extensión
//! 2. `HTTP/1.0 200 OK` + `Server`, `Content-Length`, `Content-Type`
//! 3. Los bytes del archivo, sin modificar
//!
//! Los archivos de 1 MiB o más se mapean en memoria (`memmap2`) y se
//! escriben directo desde el mapeo; los más chicos se leen a un buffer.

use crate::error::ServeError;
use crate::http::{Response, StatusCode};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Tamaño a partir del cual se usa mmap
pub const LARGE_FILE_THRESHOLD: u64 = 1024 * 1024;

/// Estrategia para copiar el archivo al socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Leer todo a un buffer y escribirlo de una vez
    Buffered,
    /// Mapear el archivo y escribir desde el mapeo
    Mapped,
}

impl Transfer {
    pub fn for_size(size: u64) -> Self {
        if size < LARGE_FILE_THRESHOLD {
            Transfer::Buffered
        } else {
            Transfer::Mapped
        }
    }
}

/// Tipo MIME a partir de la extensión (sin distinguir mayúsculas)
///
/// # Ejemplo
/// ```
/// use std::path::Path;
/// use tiny_httpd::server::static_files::content_type;
///
/// assert_eq!(content_type(Path::new("./godzilla.GIF")), "image/gif");
/// assert_eq!(content_type(Path::new("./notes")), "text/plain");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") | Some("jpe") => "image/jpeg",
        Some("png") => "image/png",
        Some("mpg") | Some("mpeg") | Some("mpe") => "video/mpeg",
        _ => "text/plain",
    }
}

/// Sirve `path` (de `size` bytes) eligiendo la estrategia por tamaño
pub fn serve<W: Write>(writer: &mut W, path: &Path, size: u64) -> Result<(), ServeError> {
    serve_with(writer, path, size, Transfer::for_size(size))
}

/// Sirve `path` con una estrategia explícita
pub fn serve_with<W: Write>(
    writer: &mut W,
    path: &Path,
    size: u64,
    transfer: Transfer,
) -> Result<(), ServeError> {
    let file = File::open(path)?;

    let head = Response::new(StatusCode::Ok)
        .with_header("Content-Length", &size.to_string())
        .with_header("Content-Type", content_type(path));
    writer.write_all(&head.to_bytes())?;

    match transfer {
        Transfer::Buffered => send_buffered(writer, file, size)?,
        Transfer::Mapped => send_mapped(writer, &file, path, size)?,
    }

    writer.flush()?;
    Ok(())
}

fn send_buffered<W: Write>(writer: &mut W, file: File, size: u64) -> Result<(), ServeError> {
    let mut buffer = Vec::with_capacity(size as usize);
    file.take(size).read_to_end(&mut buffer)?;
    writer.write_all(&buffer)?;
    Ok(())
}

fn send_mapped<W: Write>(
    writer: &mut W,
    file: &File,
    path: &Path,
    size: u64,
) -> Result<(), ServeError> {
    // SAFETY: mapeo de solo lectura que vive únicamente durante la escritura.
    // Si otro proceso trunca el archivo mientras tanto, leer el mapeo puede
    // terminar en SIGBUS.
    let map = unsafe { Mmap::map(file) }.map_err(|source| ServeError::Map {
        path: path.to_path_buf(),
        source,
    })?;

    // Nunca más de lo anunciado en Content-Length
    let len = map.len().min(size as usize);
    writer.write_all(&map[..len])?;
    Ok(())
}
