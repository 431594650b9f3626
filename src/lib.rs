//! # tiny_httpd
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente que sirve archivos estáticos y ejecuta
//! programas CGI. Demuestra conceptos de sistemas operativos:
//! productor/consumidor con una cola acotada, un pool fijo de workers,
//! fork/exec con redirección de descriptores y recolección de procesos hijos.
//!
//! ## Arquitectura
//!
//! - `queue`: cola acotada bloqueante (mutex + 2 condvars)
//! - `http`: request line, resolución de targets, responses y status codes
//! - `server`: acceptor, pool de workers y pipeline de cada request
//! - `process`: registro de hijos CGI, reaper y manejo de señales
//! - `metrics`: contadores compartidos, exportables como JSON
//! - `config`: CLI y variables de entorno
//! - `telemetry`: logging con `tracing`
//! - `error`: errores por conexión y de arranque
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use tiny_httpd::config::Config;
//! use tiny_httpd::server::Server;
//!
//! let config = Config { port: 8080, ..Config::default() };
//! let server = Server::bind(config).expect("Error al iniciar servidor");
//! server.serve().expect("Error en el loop de accept");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod process;
pub mod queue;
pub mod server;
pub mod telemetry;

#[cfg(test)]
mod test_support;
