//! Tests de integración: el servidor completo en un puerto efímero,
//! hablando HTTP/1.0 sobre sockets reales.

use std::fs;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tiny_httpd::config::Config;
use tiny_httpd::metrics::MetricsCollector;
use tiny_httpd::server::Server;

static NEXT_ROOT: AtomicUsize = AtomicUsize::new(0);

/// Document root temporal, se borra al terminar el test
struct DocRoot(PathBuf);

impl DocRoot {
    fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "tiny_httpd-it-{}-{}-{}",
            label,
            std::process::id(),
            NEXT_ROOT.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&path).unwrap();
        DocRoot(path)
    }

    fn file(&self, relative: &str, contents: &[u8], mode: u32) -> PathBuf {
        let path = self.0.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn install(&self, program: &Path, relative: &str) {
        let path = self.0.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::copy(program, &path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

impl Drop for DocRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Levanta el servidor en un thread y retorna su dirección
fn start(root: &DocRoot, workers: usize, queue_capacity: usize) -> (SocketAddr, MetricsCollector) {
    let config = Config {
        port: 0,
        host: "127.0.0.1".to_string(),
        workers,
        queue_capacity,
        root: root.0.clone(),
        reap_interval_ms: 50,
        ..Config::default()
    };

    let server = Server::bind(config).expect("bind");
    let addr = server.local_addr().unwrap();
    let metrics = server.metrics();

    thread::spawn(move || server.serve());
    (addr, metrics)
}

fn request(addr: SocketAddr, raw: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(20))).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream.shutdown(Shutdown::Write).unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    response
}

fn get(addr: SocketAddr, target: &str) -> Vec<u8> {
    request(addr, &format!("GET {} HTTP/1.0\r\nHost: localhost\r\n\r\n", target))
}

/// Separa headers y body de una respuesta
fn split(response: &[u8]) -> (String, Vec<u8>) {
    let pos = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response without blank line");
    (
        String::from_utf8_lossy(&response[..pos]).into_owned(),
        response[pos + 4..].to_vec(),
    )
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

#[test]
fn test_static_file_roundtrip() {
    let root = DocRoot::new("static");
    root.file("index.html", b"<html>root</html>", 0o644);
    root.file("img/logo.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3], 0o644);
    let (addr, _) = start(&root, 2, 4);

    let (head, body) = split(&get(addr, "/"));
    assert!(head.starts_with("HTTP/1.0 200 OK"));
    assert_eq!(header(&head, "Server"), Some("tiny_httpd"));
    assert_eq!(header(&head, "Content-Type"), Some("text/html"));
    assert_eq!(body, b"<html>root</html>");

    let (head, body) = split(&get(addr, "/img/logo.png"));
    assert_eq!(header(&head, "Content-Type"), Some("image/png"));
    assert_eq!(header(&head, "Content-Length"), Some("8"));
    assert_eq!(body, [0x89, b'P', b'N', b'G', 0, 1, 2, 3]);
}

#[test]
fn test_large_file_is_served_intact() {
    let root = DocRoot::new("large");
    let content: Vec<u8> = (0..3 * 1024 * 1024 + 17).map(|i| (i % 253) as u8).collect();
    root.file("movie.mpg", &content, 0o644);
    let (addr, _) = start(&root, 2, 4);

    let (head, body) = split(&get(addr, "/movie.mpg"));
    assert_eq!(header(&head, "Content-Type"), Some("video/mpeg"));
    assert_eq!(header(&head, "Content-Length"), Some(content.len().to_string().as_str()));
    assert_eq!(body.len(), content.len());
    assert!(body == content, "large body differs from the file");
}

#[test]
fn test_many_concurrent_clients_get_their_own_file() {
    let root = DocRoot::new("concurrent");
    let clients = 24;
    for i in 0..clients {
        let body = format!("document number {} {}", i, "x".repeat(i * 100));
        root.file(&format!("doc{}.txt", i), body.as_bytes(), 0o644);
    }
    // Más clientes que workers + capacidad de la cola
    let (addr, metrics) = start(&root, 3, 2);

    let handles: Vec<_> = (0..clients)
        .map(|i| {
            thread::spawn(move || {
                let (head, body) = split(&get(addr, &format!("/doc{}.txt", i)));
                (i, head, body)
            })
        })
        .collect();

    for handle in handles {
        let (i, head, body) = handle.join().unwrap();
        let expected = format!("document number {} {}", i, "x".repeat(i * 100));
        assert!(head.starts_with("HTTP/1.0 200 OK"), "client {}: {}", i, head);
        assert_eq!(String::from_utf8(body).unwrap(), expected, "client {}", i);
    }

    assert_eq!(metrics.snapshot().status_codes.get(&200), Some(&(clients as u64)));
}

#[test]
fn test_error_responses() {
    let root = DocRoot::new("errors");
    root.file("public.html", b"public", 0o644);
    root.file("private.html", b"private", 0o200);
    root.file("cgi-bin/plain", b"#!/bin/sh\necho nope\n", 0o644);
    let (addr, _) = start(&root, 2, 4);

    let cases = [
        ("POST /public.html HTTP/1.0\r\n\r\n", "501 Not Implemented"),
        ("GET /absent.html HTTP/1.0\r\n\r\n", "404 Not Found"),
        ("GET /private.html HTTP/1.0\r\n\r\n", "403 Forbidden"),
        ("GET /cgi-bin/plain HTTP/1.0\r\n\r\n", "403 Forbidden"),
        ("GET /../../etc/passwd HTTP/1.0\r\n\r\n", "404 Not Found"),
        ("GET /a/..%2f/b HTTP/1.0\r\n\r\n", "404 Not Found"),
    ];

    for (raw, expected) in cases {
        let (head, body) = split(&request(addr, raw));
        assert!(head.starts_with(&format!("HTTP/1.0 {}", expected)), "{:?} -> {}", raw, head);
        assert_eq!(header(&head, "Content-Type"), Some("text/html"));
        assert_eq!(header(&head, "Content-Length"), Some(body.len().to_string().as_str()));
        assert!(String::from_utf8_lossy(&body).contains("tiny_httpd"));
    }
}

#[test]
fn test_dynamic_content_and_reaping() {
    let root = DocRoot::new("cgi");
    root.install(Path::new(env!("CARGO_BIN_EXE_hello_cgi")), "cgi-bin/hello");
    let (addr, metrics) = start(&root, 2, 4);

    let response = get(addr, "/cgi-bin/hello?name=tiny&lang=rust");
    let (head, body) = split(&response);
    let body = String::from_utf8(body).unwrap();

    // Status line y Server los escribe el servidor; el resto, el programa
    assert!(head.starts_with("HTTP/1.0 200 OK\r\nServer: tiny_httpd"));
    assert_eq!(header(&head, "Content-Type"), Some("text/html"));
    assert!(body.contains("QUERY_STRING: name=tiny&lang=rust"));
    assert_eq!(metrics.snapshot().children_spawned, 1);

    // El reaper recolecta al hijo sin más actividad de clientes
    let deadline = Instant::now() + Duration::from_secs(10);
    while metrics.children_reaped() < 1 {
        assert!(Instant::now() < deadline, "CGI child was never reaped");
        thread::sleep(Duration::from_millis(20));
    }

    let reaps = metrics.snapshot().recent_reaps;
    assert_eq!(reaps.len(), 1);
    assert_eq!(reaps[0].exit_code, Some(0));
}

#[test]
fn test_sigterm_exits_cleanly() {
    let root = DocRoot::new("sigterm");
    root.file("index.html", b"up", 0o644);

    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut child = Command::new(env!("CARGO_BIN_EXE_tiny_httpd"))
        .arg(port.to_string())
        .args(["--host", "127.0.0.1", "--workers", "2"])
        .arg("--root")
        .arg(&root.0)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while TcpStream::connect(addr).is_err() {
        assert!(Instant::now() < deadline, "server never started listening");
        thread::sleep(Duration::from_millis(20));
    }
    let (head, body) = split(&get(addr, "/"));
    assert!(head.starts_with("HTTP/1.0 200 OK"));
    assert_eq!(body, b"up");

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("server did not exit after SIGTERM");
        }
        thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(exit.code(), Some(0));
}
