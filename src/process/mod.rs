//! # Procesos CGI y Señales
//! src/process/mod.rs
//!
//! - `reaper`: registro de hijos y thread que los recolecta sin bloquear
//! - `signals`: SIGCHLD → reaper; SIGINT/SIGTERM/SIGQUIT → shutdown

pub mod reaper;
pub mod signals;

pub use reaper::{ChildRegistry, Reaped, Reaper, Wake};
