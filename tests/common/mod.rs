//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super_info::config::{ServiceConfig, UpstreamConfig};
use super_info::{HttpServer, Shutdown};

/// Canned upstream answer for a request path: `(status, body)`.
pub type Handler = fn(&str) -> (u16, String);

/// Start a programmable mock backend on an ephemeral port.
///
/// The closure receives the request target (path and query).
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
                        let target = read_request_target(&mut socket).await;
                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read the request head and return its target, e.g. `/v3.1/name/france`.
async fn read_request_target(socket: &mut TcpStream) -> String {
    let mut head = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                head.extend_from_slice(&chunk[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&head)
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string()
}

/// A mock upstream that counts the requests it serves.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
}

impl MockUpstream {
    pub async fn start(handler: Handler) -> Self {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let addr = start_programmable_backend(move |target| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { handler(&target) }
        })
        .await;
        Self { addr, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

pub const FRANCE: &str = r#"[{
    "name": { "common": "France", "official": "French Republic" },
    "capital": ["Paris"],
    "population": 67391582,
    "flags": { "png": "https://flagcdn.com/w320/fr.png" },
    "capitalInfo": { "latlng": [48.87, 2.33] },
    "currencies": { "EUR": { "name": "Euro", "symbol": "€" } }
}]"#;

pub fn countries_ok(target: &str) -> (u16, String) {
    if target.contains("atlantis") {
        (404, r#"{"status":404,"message":"Not Found"}"#.to_string())
    } else {
        (200, FRANCE.to_string())
    }
}

pub fn weather_ok(_: &str) -> (u16, String) {
    (
        200,
        r#"{"current_weather":{"temperature":18.5,"windspeed":12.0,"weathercode":3}}"#.to_string(),
    )
}

pub fn trivia_ok(_: &str) -> (u16, String) {
    (200, "42 is the answer to everything.".to_string())
}

pub fn dictionary_ok(_: &str) -> (u16, String) {
    (
        200,
        r#"[{"word":"serendipity","meanings":[{"definitions":[
            {"definition":"Luck that takes the form of finding valuable things.",
             "example":"A happy serendipity."}
        ]}]}]"#
            .to_string(),
    )
}

pub fn exchange_ok(_: &str) -> (u16, String) {
    (200, r#"{"result":"success","rates":{"USD":1.0,"EUR":0.92}}"#.to_string())
}

pub fn server_error(_: &str) -> (u16, String) {
    (500, "boom".to_string())
}

/// Handlers for the five upstreams; all healthy by default.
pub struct Behaviour {
    pub countries: Handler,
    pub weather: Handler,
    pub trivia: Handler,
    pub dictionary: Handler,
    pub exchange: Handler,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            countries: countries_ok,
            weather: weather_ok,
            trivia: trivia_ok,
            dictionary: dictionary_ok,
            exchange: exchange_ok,
        }
    }
}

pub struct MockUpstreams {
    pub countries: MockUpstream,
    pub weather: MockUpstream,
    pub trivia: MockUpstream,
    pub dictionary: MockUpstream,
    pub exchange: MockUpstream,
}

impl MockUpstreams {
    pub async fn start(behaviour: Behaviour) -> Self {
        Self {
            countries: MockUpstream::start(behaviour.countries).await,
            weather: MockUpstream::start(behaviour.weather).await,
            trivia: MockUpstream::start(behaviour.trivia).await,
            dictionary: MockUpstream::start(behaviour.dictionary).await,
            exchange: MockUpstream::start(behaviour.exchange).await,
        }
    }

    /// Service config pointing at these mocks, with short retry delays.
    pub fn config(&self) -> ServiceConfig {
        let upstream = |mock: &MockUpstream| UpstreamConfig {
            base_url: mock.url(),
            timeout_ms: 2000,
            max_attempts: 2,
            base_delay_ms: 10,
        };

        let mut config = ServiceConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.upstreams.countries = upstream(&self.countries);
        config.upstreams.weather = upstream(&self.weather);
        config.upstreams.trivia = upstream(&self.trivia);
        config.upstreams.dictionary = upstream(&self.dictionary);
        config.upstreams.exchange = upstream(&self.exchange);
        config.health.timeout_ms = 1000;
        config
    }
}

/// A running server instance.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub async fn start(config: ServiceConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(config).unwrap();
        let shutdown = Shutdown::new();

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        Self { addr, shutdown }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/api/super-info", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
