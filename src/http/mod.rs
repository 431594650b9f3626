//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementa el subconjunto de HTTP/1.0 que habla el servidor, sin
//! librerías de alto nivel:
//!
//! - Parsing de la request line y descarte de headers
//! - Resolución del target a un archivo estático o a un programa CGI
//! - Construcción de responses y páginas de error
//! - Códigos de estado
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query HTTP/1.0\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Server: tiny_httpd\r\n
//! Content-Length: 5\r\n
//! Content-Type: text/plain\r\n
//! \r\n
//! hello
//! ```
//!
//! Una request por conexión: después de la respuesta el socket se cierra.

pub mod request;
pub mod response;
pub mod status;
pub mod target;

pub use request::{Method, ParseError, RequestLine};
pub use response::{Response, SERVER_NAME};
pub use status::StatusCode;
pub use target::{ResolveError, Target};
