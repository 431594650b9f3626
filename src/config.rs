//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración por argumentos CLI y variables de entorno. El puerto es
//! el único argumento obligatorio.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./tiny_httpd 8080 \
//!   --workers 8 \
//!   --queue-capacity 32 \
//!   --root ./public
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! WORKERS=16 DOC_ROOT=/srv/www RUST_LOG=debug ./tiny_httpd 8080
//! ```

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Configuración del servidor HTTP/1.0
#[derive(Debug, Clone, Parser)]
#[command(name = "tiny_httpd")]
#[command(about = "Servidor HTTP/1.0 concurrente con contenido estático y CGI")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === Concurrencia ===

    /// Número de workers del pool
    #[arg(long, default_value = "8", env = "WORKERS")]
    pub workers: usize,

    /// Conexiones aceptadas que pueden esperar un worker
    #[arg(long = "queue-capacity", default_value = "32", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    // === Contenido ===

    /// Directorio raíz del que se sirven los archivos
    #[arg(long, default_value = ".", env = "DOC_ROOT")]
    pub root: PathBuf,

    /// Segmento de la ruta que marca un programa CGI
    #[arg(long = "cgi-dir", default_value = "cgi-bin", env = "CGI_DIR")]
    pub cgi_dir: String,

    // === Procesos ===

    /// Intervalo de respaldo del reaper en milisegundos
    #[arg(long = "reap-interval-ms", default_value = "500", env = "REAP_INTERVAL_MS")]
    pub reap_interval_ms: u64,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use tiny_httpd::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }

        if self.queue_capacity == 0 {
            return Err("Queue capacity must be >= 1".to_string());
        }

        if self.reap_interval_ms == 0 {
            return Err("Reap interval must be > 0".to_string());
        }

        // Se compara contra segmentos individuales de la ruta
        if self.cgi_dir.is_empty() || self.cgi_dir.contains('/') {
            return Err("CGI dir must be a single path segment".to_string());
        }

        Ok(())
    }

    /// Deja un resumen de la configuración en el log
    pub fn print_summary(&self) {
        info!(
            address = %self.address(),
            root = %self.root.display(),
            cgi_dir = %self.cgi_dir,
            "network and content"
        );
        info!(
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            reap_interval_ms = self.reap_interval_ms,
            "worker pool and queue"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            workers: 8,
            queue_capacity: 32,
            root: PathBuf::from("."),
            cgi_dir: "cgi-bin".to_string(),
            reap_interval_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.workers, 8);
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.cgi_dir, "cgi-bin");
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_invalid_workers() {
        let mut config = Config::default();
        config.workers = 0;
        let result = config.validate();
        assert!(result.unwrap_err().contains("Workers"));
    }

    #[test]
    fn test_validate_invalid_queue_capacity() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        let result = config.validate();
        assert!(result.unwrap_err().contains("Queue capacity"));
    }

    #[test]
    fn test_validate_invalid_reap_interval() {
        let mut config = Config::default();
        config.reap_interval_ms = 0;
        let result = config.validate();
        assert!(result.unwrap_err().contains("Reap interval"));
    }

    #[test]
    fn test_validate_cgi_dir() {
        let mut config = Config::default();

        config.cgi_dir = String::new();
        assert!(config.validate().is_err());

        config.cgi_dir = "cgi/bin".to_string();
        assert!(config.validate().is_err());

        config.cgi_dir = "scripts".to_string();
        assert!(config.validate().is_ok());
    }

    // ==================== CLI ====================

    #[test]
    fn test_parse_port_only() {
        let config = Config::try_parse_from(["tiny_httpd", "9090"]).unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_all_flags() {
        let config = Config::try_parse_from([
            "tiny_httpd",
            "3000",
            "--host",
            "127.0.0.1",
            "--workers",
            "2",
            "--queue-capacity",
            "4",
            "--root",
            "/srv/www",
            "--cgi-dir",
            "scripts",
            "--reap-interval-ms",
            "50",
        ])
        .unwrap();

        assert_eq!(config.address(), "127.0.0.1:3000");
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.root, PathBuf::from("/srv/www"));
        assert_eq!(config.cgi_dir, "scripts");
        assert_eq!(config.reap_interval_ms, 50);
    }

    #[test]
    fn test_parse_requires_numeric_port() {
        assert!(Config::try_parse_from(["tiny_httpd"]).is_err());
        assert!(Config::try_parse_from(["tiny_httpd", "http"]).is_err());
        assert!(Config::try_parse_from(["tiny_httpd", "70000"]).is_err());
    }

    #[test]
    fn test_config_print_summary() {
        let config = Config::default();
        // Should not panic
        config.print_summary();
    }
}
