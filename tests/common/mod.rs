//! Shared utilities for integration tests.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use thumbor_guard::config::GuardConfig;
use thumbor_guard::{GuardRuntime, HttpServer, Shutdown};

pub const SECURITY_KEY: &str = "MY_SECURE_KEY";

/// Start a mock upstream that echoes the request target.
///
/// The body and the `x-echo-path` header both carry the path and query the
/// upstream received, byte for byte.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf);
                let mut request_line = head.lines().next().unwrap_or_default().split(' ');
                let method = request_line.next().unwrap_or_default().to_string();
                let target = request_line.next().unwrap_or_default().to_string();

                let body = if method == "HEAD" { "" } else { target.as_str() };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nX-Echo-Path: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    target,
                    target.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Config pointing at `upstream`, with metrics off.
pub fn guard_config(upstream: SocketAddr) -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = upstream.to_string();
    config.security.security_key = SECURITY_KEY.into();
    config.observability.metrics_enabled = false;
    config
}

/// A running guard and the handles that control it.
pub struct GuardHandle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<GuardConfig>,
}

impl GuardHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the guard on an ephemeral port.
pub async fn start_guard(config: GuardConfig) -> GuardHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (config_tx, config_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(GuardRuntime::from_config(config).unwrap());
    tokio::spawn(server.run(listener, config_rx, shutdown.subscribe()));

    GuardHandle {
        addr,
        shutdown,
        config_tx,
    }
}
