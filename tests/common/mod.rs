//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hostgate::http::{AppState, HttpServer};
use hostgate::observability::AccessLogger;
use hostgate::routing::RoutingTable;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one request head (up to the blank line) from `socket`.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn respond(socket: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line(status),
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Start a mock backend that returns a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, response.to_string()) }).await
}

/// Start a backend that answers with the request head it received.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|head| async move { (200, head) }).await
}

/// Start a programmable mock backend. `f` gets the raw request head.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let (status, body) = f(head).await;
                        respond(&mut socket, status, &body).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A proxy running over plain HTTP with its config and access log in a temp dir.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub routes: Arc<RoutingTable>,
    pub config_path: PathBuf,
    pub access_log_path: PathBuf,
    access_log: Arc<AccessLogger>,
    _dir: TempDir,
}

impl TestProxy {
    /// `config` is written verbatim; `accessLog` is pointed into the temp dir.
    pub async fn start(mut config: Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let access_log_path = dir.path().join("access.log");
        let config_path = dir.path().join("config.json");
        config["accessLog"] = Value::from(access_log_path.to_string_lossy().into_owned());
        std::fs::write(&config_path, config.to_string()).unwrap();

        let routes = Arc::new(RoutingTable::load(&config_path).unwrap());
        let access_log = Arc::new(AccessLogger::open(&access_log_path).unwrap());
        let server = HttpServer::new(AppState::new(Arc::clone(&routes), Arc::clone(&access_log)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run(listener).await;
        });

        Self {
            addr,
            routes,
            config_path,
            access_log_path,
            access_log,
            _dir: dir,
        }
    }

    /// Fresh handler state sharing this proxy's routes and access log.
    pub fn state(&self) -> AppState {
        AppState::new(Arc::clone(&self.routes), Arc::clone(&self.access_log))
    }

    /// URL on this proxy for a virtual host name.
    pub fn url(&self, host: &str, path: &str) -> String {
        format!("http://{}:{}{}", host, self.addr.port(), path)
    }

    /// Client that resolves every name used in tests to the proxy.
    pub fn client(&self, hosts: &[&str]) -> reqwest::Client {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy();
        for host in hosts {
            builder = builder.resolve(host, self.addr);
        }
        builder.build().unwrap()
    }

    pub fn rewrite_config(&self, contents: &str) {
        std::fs::write(&self.config_path, contents).unwrap();
    }

    /// Parsed access log lines.
    pub fn access_records(&self) -> Vec<Value> {
        std::fs::read_to_string(&self.access_log_path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}
