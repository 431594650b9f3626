//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! GET /cgi-bin/adder?1&2 HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! User-Agent: curl/7.68.0\r\n
//! \r\n
//! ```
//!
//! Solo se interpreta la request line. Los headers se leen hasta la línea
//! vacía y se descartan: el servidor no actúa sobre ellos.

use std::io::{self, BufRead, Read};
use thiserror::Error;
use tracing::debug;

/// Largo máximo de una línea (request line o header)
pub const MAX_LINE: usize = 8192;

/// Métodos HTTP soportados. Solo lectura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,
}

impl Method {
    /// Parsea un método (sin distinguir mayúsculas, como curl -X get)
    fn from_token(token: &str) -> Result<Self, ParseError> {
        if token.eq_ignore_ascii_case("GET") {
            Ok(Method::GET)
        } else {
            Err(ParseError::UnsupportedMethod(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
        }
    }
}

/// Errores de la request line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Línea vacía o conexión cerrada antes de enviar nada
    #[error("empty request line")]
    Empty,

    /// Método distinto de GET
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Falta el target o la versión
    #[error("malformed request line: {0}")]
    Malformed(String),
}

/// Request line parseada: `METHOD SP target SP version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    version: String,
}

impl RequestLine {
    /// Parsea la request line (separada por espacios).
    ///
    /// El método se valida antes que el resto: un método no soportado
    /// siempre produce `UnsupportedMethod`, aunque falten campos.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use tiny_httpd::http::RequestLine;
    ///
    /// let line = RequestLine::parse("GET /index.html HTTP/1.0\r\n").unwrap();
    /// assert_eq!(line.target(), "/index.html");
    /// assert_eq!(line.version(), "HTTP/1.0");
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split_whitespace();

        let method = parts.next().ok_or(ParseError::Empty)?;
        let method = Method::from_token(method)?;

        let (target, version) = match (parts.next(), parts.next()) {
            (Some(target), Some(version)) => (target, version),
            _ => return Err(ParseError::Malformed(line.trim_end().to_string())),
        };

        Ok(RequestLine {
            method,
            target: target.to_string(),
            version: version.to_string(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target tal cual llegó (path + query)
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Lee una línea terminada en `\n` de a lo sumo `MAX_LINE` bytes.
///
/// Retorna `None` en EOF. Bytes no UTF-8 se reemplazan.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader.by_ref().take(MAX_LINE as u64).read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Consume los headers hasta la línea vacía (o EOF).
///
/// Un header más largo que `MAX_LINE` llega en varios pedazos; solo un
/// pedazo que empieza una línea nueva puede ser la línea vacía.
///
/// Retorna cuántos headers se descartaron.
pub fn consume_headers<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    let mut count = 0;
    let mut at_line_start = true;

    while let Some(line) = read_line(reader)? {
        if at_line_start && (line == "\r\n" || line == "\n") {
            break;
        }
        if at_line_start {
            debug!(header = line.trim_end(), "request header");
            count += 1;
        }
        at_line_start = line.ends_with('\n');
    }

    Ok(count)
}
