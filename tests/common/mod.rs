//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use lb_proxy::config::{ProxyConfig, ServerConfig};
use lb_proxy::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a raw TCP backend that answers every connection with a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                // Drain the request head before answering.
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start an axum backend that identifies itself and reflects the request.
///
/// - body: the request body if one was sent, otherwise `name`
/// - `x-backend`: `name`
/// - `x-seen-uri`: path and query as received
/// - `x`: copied from the request when present
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move |headers: HeaderMap, uri: Uri, body: Bytes| async move {
        echo(name, headers, uri, body)
    });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

fn echo(name: &'static str, headers: HeaderMap, uri: Uri, body: Bytes) -> Response {
    let mut response = if body.is_empty() {
        (StatusCode::OK, name).into_response()
    } else {
        (StatusCode::OK, body).into_response()
    };
    let out = response.headers_mut();
    out.insert("x-backend", HeaderValue::from_static(name));
    if let Ok(seen) = HeaderValue::from_str(&uri.to_string()) {
        out.insert("x-seen-uri", seen);
    }
    if let Some(x) = headers.get("x") {
        out.insert("x", x.clone());
    }
    response
}

/// Start an axum backend that answers every request with `status` and `body`.
pub async fn start_status_backend(status: StatusCode, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move || async move { (status, body) });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config pointing at `backends` with the given strategy.
pub fn config_for(backends: &[SocketAddr], strategy: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.load_balancer.strategy = strategy.to_string();
    config.load_balancer.servers = backends
        .iter()
        .map(|addr| ServerConfig::new(format!("http://{addr}")))
        .collect();
    config.timeouts.connect_secs = 1;
    config.timeouts.upstream_secs = 5;
    config
}

/// Run the proxy on an ephemeral port. Keep the returned `Shutdown` alive for
/// as long as the proxy should serve.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
