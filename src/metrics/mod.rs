//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores compartidos entre el acceptor, los workers y el reaper:
//! - Requests por código de estado y latencias (p50, p95, p99)
//! - Workers ocupados
//! - Procesos CGI lanzados y recolectados

pub mod collector;

pub use collector::{BusyGuard, MetricsCollector, MetricsSnapshot, ReapRecord};
