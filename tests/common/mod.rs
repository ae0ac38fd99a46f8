//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use action_gateway::audit::sink_from_config;
use action_gateway::config::GatewayConfig;
use action_gateway::gateway::{ActionGateway, GatewaySettings};
use action_gateway::http::HttpServer;
use action_gateway::lifecycle::Shutdown;
use action_gateway::manifest::{ManifestRegistry, RegistryHandle};
use action_gateway::security::auth_from_config;

pub const STORE_MANIFEST: &str = r#"{
    "version": "1.0",
    "name": "Demo Store",
    "actions": [
        {"id": "search_products", "method": "GET", "endpoint": "/api/search",
         "inputs": [
            {"name": "q", "type": "string", "required": true,
             "validation": {"minLength": 2}},
            {"name": "page", "type": "integer", "default": 1,
             "validation": {"min": 1}}
         ]},
        {"id": "add_to_cart", "method": "POST", "endpoint": "/cart/add",
         "inputs": [
            {"name": "product_id", "type": "string", "required": true,
             "validation": {"pattern": "^PROD-[A-Z0-9]+$"}},
            {"name": "quantity", "type": "integer", "default": 1,
             "validation": {"min": 1, "max": 100}}
         ]},
        {"id": "add_to_wishlist", "method": "POST", "endpoint": "/wishlist/{product_id}",
         "authentication_required": true,
         "inputs": [{"name": "product_id", "type": "string", "required": true}]}
    ],
    "rate_limits": {"requests_per_minute": 60, "burst_limit": 10},
    "authentication": {"methods": ["session", "api_key"]}
}"#;

/// A gateway served on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: ActionGateway,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `manifest` with `config`, wiring auth and audit from the config
/// the same way the server binary does.
pub async fn spawn_gateway(config: GatewayConfig, manifest: &str) -> TestGateway {
    let registry = RegistryHandle::new(ManifestRegistry::parse(manifest).unwrap());
    let gateway = ActionGateway::builder(registry)
        .auth(auth_from_config(&config.auth))
        .audit(sink_from_config(&config.audit))
        .settings(GatewaySettings::from_config(&config))
        .build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(&config, gateway.clone());
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestGateway {
        addr,
        gateway,
        shutdown,
    }
}

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a mock upstream on an ephemeral port that answers every request
/// with `status` and `body`, reporting each request it receives.
pub async fn start_recording_upstream(
    status: u16,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<SeenRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let tx = Arc::new(tx);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(seen) = read_request(&mut socket).await {
                    let _ = tx.send(seen);
                }
                let status_text = match status {
                    200 => "200 OK",
                    201 => "201 Created",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(SeenRequest {
        request_line,
        headers,
        body,
    })
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Headers that mark a request as coming from the named agent.
pub fn agent(builder: reqwest::RequestBuilder, name: &str) -> reqwest::RequestBuilder {
    builder
        .header("X-AI-Agent", "true")
        .header("X-AI-Agent-Name", name)
}
