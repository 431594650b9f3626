//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! - `tcp`: socket de escucha y loop de accept que alimenta la cola
//! - `pool`: workers fijos que consumen la cola
//! - `pipeline`: una request de principio a fin
//! - `static_files` / `dynamic`: las dos formas de responder un GET

pub mod dynamic;
pub mod pipeline;
pub mod pool;
pub mod static_files;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use pipeline::Pipeline;
pub use pool::WorkerPool;
pub use tcp::Server;
