//! # Construcción de Respuestas HTTP
//!
//! API para construir respuestas HTTP/1.0 de forma estructurada (status +
//! headers ordenados + body) y convertirlas a bytes para el socket.
//!
//! ## Formato de una respuesta HTTP/1.0
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Server: tiny_httpd\r\n
//! Content-Length: 13\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! <html>...</html>
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use tiny_httpd::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/plain")
//!     .with_body("Hello");
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.ends_with(b"\r\n\r\nHello"));
//! ```

use super::StatusCode;
use std::io::{self, Write};

/// Valor del header `Server` en todas las respuestas
pub const SERVER_NAME: &str = "tiny_httpd";

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP
    status: StatusCode,

    /// Headers en el orden en que se escriben al socket.
    /// Un nombre repetido reemplaza al valor anterior.
    headers: Vec<(String, String)>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta con el header `Server` ya incluido
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![("Server".to_string(), SERVER_NAME.to_string())],
            body: Vec::new(),
        }
    }

    /// Agrega (o reemplaza) un header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, existing_value)) => *existing_value = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el cuerpo desde un string y calcula `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    /// Establece el cuerpo desde bytes y calcula `Content-Length`
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        let length = self.body.len().to_string();
        self.add_header("Content-Length", &length);
        self
    }

    /// Página de error HTML.
    ///
    /// `cause` es lo que provocó el error (el método, el path) y `message`
    /// una explicación corta. Ambos se escapan antes de insertarlos.
    ///
    /// # Ejemplo
    /// ```
    /// use tiny_httpd::http::{Response, StatusCode};
    ///
    /// let response = Response::client_error(
    ///     StatusCode::NotFound,
    ///     "./missing.html",
    ///     "couldn't find this file",
    /// );
    /// let body = String::from_utf8_lossy(response.body());
    /// assert!(body.contains("404: Not Found"));
    /// assert!(body.contains("./missing.html"));
    /// ```
    pub fn client_error(status: StatusCode, cause: &str, message: &str) -> Self {
        let body = format!(
            "<html><title>Tiny Error</title><body bgcolor=\"ffffff\">\r\n\
             {}: {}\r\n\
             <p>{}: {}\r\n\
             <hr><em>The {} web server</em>\r\n",
            status.as_u16(),
            status.reason_phrase(),
            escape_html(message),
            escape_html(cause),
            SERVER_NAME,
        );

        Self::new(status)
            .with_header("Content-Type", "text/html")
            .with_body(&body)
    }

    /// Status line y headers, sin la línea vacía final.
    ///
    /// Lo usa el servidor CGI: el programa externo completa los headers.
    pub fn head(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result
    }

    /// Respuesta completa: head, línea vacía y body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head();
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);
        result
    }

    /// Escribe la respuesta completa en una sola llamada
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Busca un header (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
