//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta contadores del servidor en tiempo real: requests por código de
//! estado, latencias, workers ocupados y procesos CGI lanzados/recolectados.
//! Todo vive detrás de un único mutex.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Latencias guardadas para calcular percentiles
const MAX_LATENCIES: usize = 10_000;

/// Procesos recolectados que se recuerdan para diagnóstico
const MAX_RECENT_REAPS: usize = 32;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
#[derive(Default)]
struct MetricsData {
    /// Conexiones aceptadas y encoladas
    accepted: u64,

    /// Requests atendidas (cualquier status)
    total_requests: u64,

    /// Requests por código de estado
    status_codes: BTreeMap<u16, u64>,

    /// Conexiones abandonadas por errores de transporte
    transport_errors: u64,

    /// Latencias en microsegundos (ventana deslizante)
    latencies: VecDeque<u64>,

    /// Workers procesando una conexión en este momento
    busy_workers: u64,

    /// Programas CGI lanzados
    children_spawned: u64,

    /// Programas CGI recolectados por el reaper
    children_reaped: u64,

    /// Últimos procesos recolectados
    recent_reaps: VecDeque<ReapRecord>,
}

/// Un proceso hijo recolectado
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReapRecord {
    pub pid: u32,
    /// `None` si el proceso terminó por una señal
    pub exit_code: Option<i32>,
}

/// Snapshot serializable de las métricas
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub accepted: u64,
    pub total_requests: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub transport_errors: u64,
    pub busy_workers: u64,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
    pub children_spawned: u64,
    pub children_reaped: u64,
    pub recent_reaps: Vec<ReapRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Una conexión entró a la cola
    pub fn record_accept(&self) {
        self.lock().accepted += 1;
    }

    /// Registra una request terminada con su status y latencia
    pub fn record_request(&self, status_code: u16, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);
    }

    pub fn record_transport_error(&self) {
        self.lock().transport_errors += 1;
    }

    /// Marca un worker como ocupado hasta que se suelte el guard.
    ///
    /// El guard descuenta también si el handler hace panic.
    pub fn worker_busy(&self) -> BusyGuard<'_> {
        self.lock().busy_workers += 1;
        BusyGuard { metrics: self }
    }

    fn worker_idle(&self) {
        let mut data = self.lock();
        data.busy_workers = data.busy_workers.saturating_sub(1);
    }

    pub fn record_spawn(&self) {
        self.lock().children_spawned += 1;
    }

    /// Registra un hijo recolectado por el reaper
    pub fn record_reap(&self, pid: u32, exit_code: Option<i32>) {
        let mut data = self.lock();

        data.children_reaped += 1;
        if data.recent_reaps.len() >= MAX_RECENT_REAPS {
            data.recent_reaps.pop_front();
        }
        data.recent_reaps.push_back(ReapRecord { pid, exit_code });
    }

    pub fn children_reaped(&self) -> u64 {
        self.lock().children_reaped
    }

    /// ¿El reaper ya recolectó este pid? (solo entre los recientes)
    pub fn was_reaped(&self, pid: u32) -> bool {
        self.lock().recent_reaps.iter().any(|reap| reap.pid == pid)
    }

    pub fn busy_workers(&self) -> u64 {
        self.lock().busy_workers
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let (p50, p95, p99, avg) = percentiles(&data.latencies);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            accepted: data.accepted,
            total_requests: data.total_requests,
            status_codes: data.status_codes.clone(),
            transport_errors: data.transport_errors,
            busy_workers: data.busy_workers,
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
            children_spawned: data.children_spawned,
            children_reaped: data.children_reaped,
            recent_reaps: data.recent_reaps.iter().cloned().collect(),
        }
    }

    /// Snapshot en JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }
}

/// Guard retornado por `MetricsCollector::worker_busy`
#[must_use = "el worker queda libre apenas se suelta el guard"]
pub struct BusyGuard<'a> {
    metrics: &'a MetricsCollector,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.metrics.worker_idle();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calcula percentiles (p50, p95, p99) y promedio
fn percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (p50, p95, p99, avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_requests_by_status() {
        let collector = MetricsCollector::new();

        collector.record_request(200, Duration::from_millis(10));
        collector.record_request(200, Duration::from_millis(20));
        collector.record_request(404, Duration::from_millis(5));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.status_codes.get(&200), Some(&2));
        assert_eq!(snapshot.status_codes.get(&404), Some(&1));
    }

    #[test]
    fn test_percentiles() {
        let collector = MetricsCollector::new();

        for i in 1..=100 {
            collector.record_request(200, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert!(snapshot.latency_p50_us > 0);
        assert!(snapshot.latency_p95_us > snapshot.latency_p50_us);
        assert!(snapshot.latency_p99_us > snapshot.latency_p95_us);
    }

    #[test]
    fn test_latency_window_management() {
        let collector = MetricsCollector::new();

        for i in 0..(MAX_LATENCIES as u64 + 500) {
            collector.record_request(200, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, MAX_LATENCIES as u64 + 500);
        assert_eq!(collector.lock().latencies.len(), MAX_LATENCIES);
    }

    #[test]
    fn test_busy_workers_never_negative() {
        let collector = MetricsCollector::new();

        let first = collector.worker_busy();
        let second = collector.worker_busy();
        assert_eq!(collector.busy_workers(), 2);

        drop(first);
        drop(second);
        collector.worker_idle();
        assert_eq!(collector.busy_workers(), 0);
    }

    #[test]
    fn test_busy_guard_released_on_panic() {
        let collector = MetricsCollector::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _busy = collector.worker_busy();
            panic!("handler failure");
        }));

        assert!(result.is_err());
        assert_eq!(collector.busy_workers(), 0);
    }

    #[test]
    fn test_reap_records_are_bounded() {
        let collector = MetricsCollector::new();

        for pid in 0..(MAX_RECENT_REAPS as u32 + 8) {
            collector.record_reap(pid, Some(0));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.children_reaped, MAX_RECENT_REAPS as u64 + 8);
        assert_eq!(snapshot.recent_reaps.len(), MAX_RECENT_REAPS);
        assert!(!collector.was_reaped(0));
        assert!(collector.was_reaped(MAX_RECENT_REAPS as u32 + 7));
    }

    #[test]
    fn test_json_snapshot() {
        let collector = MetricsCollector::new();
        collector.record_accept();
        collector.record_request(501, Duration::from_millis(1));
        collector.record_spawn();
        collector.record_reap(4242, None);

        let json: serde_json::Value = serde_json::from_str(&collector.to_json()).unwrap();
        assert_eq!(json["accepted"], 1);
        assert_eq!(json["status_codes"]["501"], 1);
        assert_eq!(json["children_spawned"], 1);
        assert_eq!(json["recent_reaps"][0]["pid"], 4242);
        assert!(json["recent_reaps"][0]["exit_code"].is_null());
    }
}
