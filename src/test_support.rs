//! Loopback HTTP stub used by the network-facing tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct StubResponse {
    status: u16,
    body: Vec<u8>,
    send_length: bool,
    announced_length: Option<usize>,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
}

impl StubResponse {
    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            send_length: true,
            announced_length: None,
            chunk_size: 16 * 1024,
            chunk_delay: None,
        }
    }

    pub fn json(body: &str) -> Self {
        Self::bytes(body.as_bytes().to_vec())
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::bytes(Vec::new())
        }
    }

    pub fn without_length(mut self) -> Self {
        self.send_length = false;
        self
    }

    /// Announce `length` bytes but send only the body.
    pub fn truncated(mut self, length: usize) -> Self {
        self.announced_length = Some(length);
        self
    }

    pub fn throttled(mut self, chunk_size: usize, delay: Duration) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.chunk_delay = Some(delay);
        self
    }
}

pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn serve(routes: Vec<(&str, StubResponse)>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Arc<HashMap<String, StubResponse>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, response)| (path.to_owned(), response))
            .collect(),
    );

    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let _ = handle_connection(stream, &routes).await;
            });
        }
    });

    StubServer { addr, handle }
}

/// A URL on a port nothing listens on.
pub async fn unreachable_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{path}")
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: &HashMap<String, StubResponse>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") && request.len() < 16 * 1024 {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        request.extend_from_slice(&buf[..read]);
    }

    let head = String::from_utf8_lossy(&request);
    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);
    let response = routes
        .get(path)
        .cloned()
        .unwrap_or_else(|| StubResponse::status(404));

    let reason = if response.status < 400 { "OK" } else { "Error" };
    let mut header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n",
        response.status, reason
    );
    if response.send_length {
        let length = response.announced_length.unwrap_or(response.body.len());
        header.push_str(&format!("Content-Length: {length}\r\n"));
    }
    header.push_str("\r\n");
    stream.write_all(header.as_bytes()).await?;
    stream.flush().await?;

    for chunk in response.body.chunks(response.chunk_size) {
        if let Some(delay) = response.chunk_delay {
            tokio::time::sleep(delay).await;
        }
        stream.write_all(chunk).await?;
        stream.flush().await?;
    }
    stream.shutdown().await
}
