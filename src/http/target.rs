//! # Resolución del Target
//! src/http/target.rs
//!
//! Traduce el target de la request a un archivo bajo el document root y lo
//! clasifica:
//!
//! ```text
//! /                        → Static  { ./index.html }
//! /docs/manual.html        → Static  { ./docs/manual.html }
//! /cgi-bin/adder?1&2       → Dynamic { ./cgi-bin/adder, query: "1&2" }
//! /../etc/passwd           → Err(Traversal)
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Documento servido cuando el path termina en `/`
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Target ya resuelto a un path del filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Archivo que se envía tal cual
    Static { path: PathBuf },

    /// Ejecutable CGI y su query string (vacía si no hay `?`)
    Dynamic { path: PathBuf, query: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// El target contiene `..`; se rechaza sin tocar el filesystem
    #[error("parent-directory traversal in target: {0}")]
    Traversal(String),
}

impl Target {
    /// Resuelve `raw` bajo `doc_root`.
    ///
    /// Cualquier aparición de `..` se rechaza, aunque no forme un segmento
    /// completo. Un target es dinámico cuando alguno de los segmentos de su
    /// path es exactamente `cgi_dir`.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use std::path::Path;
    /// use tiny_httpd::http::Target;
    ///
    /// let target = Target::resolve("/cgi-bin/hello?name=ada", Path::new("."), "cgi-bin").unwrap();
    /// assert!(target.is_dynamic());
    /// assert_eq!(target.query(), "name=ada");
    /// ```
    pub fn resolve(raw: &str, doc_root: &Path, cgi_dir: &str) -> Result<Self, ResolveError> {
        if raw.contains("..") {
            return Err(ResolveError::Traversal(raw.to_string()));
        }

        let (path_part, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None => (raw, ""),
        };

        let is_dynamic = path_part.split('/').any(|segment| segment == cgi_dir);
        let mut path = doc_root.join(path_part.trim_start_matches('/'));

        if is_dynamic {
            return Ok(Target::Dynamic {
                path,
                query: query.to_string(),
            });
        }

        if path_part.is_empty() || path_part.ends_with('/') {
            path.push(DEFAULT_DOCUMENT);
        }

        Ok(Target::Static { path })
    }

    pub fn path(&self) -> &Path {
        match self {
            Target::Static { path } | Target::Dynamic { path, .. } => path,
        }
    }

    /// Query string para CGI; vacía para archivos estáticos
    pub fn query(&self) -> &str {
        match self {
            Target::Static { .. } => "",
            Target::Dynamic { query, .. } => query,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Target::Dynamic { .. })
    }
}
