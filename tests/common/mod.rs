#![allow(dead_code)]

use chatstream::{ErrorInfo, StreamCallbacks, StreamEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<StreamEvent>,
}

impl StreamCallbacks for Recorder {
    fn on_token(&mut self, text: &str) {
        self.events.push(StreamEvent::Token(text.to_string()));
    }

    fn on_done(&mut self) {
        self.events.push(StreamEvent::Done);
    }

    fn on_error(&mut self, error: ErrorInfo) {
        self.events.push(StreamEvent::Error(error));
    }
}

impl Recorder {
    pub fn terminal_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_terminal()).count()
    }
}

pub fn sse_frame(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "delta": { "content": text } }] })
    )
}

pub fn http() -> reqwest::Client {
    reqwest::Client::new()
}

/// What the raw server does after reading the request.
pub enum Script {
    /// Never send response headers.
    Silent,
    /// Send 200 headers and these chunks, then keep the connection open.
    StreamThenStall(Vec<Vec<u8>>),
    /// Promise a longer body than these chunks, then drop the connection.
    StreamThenClose(Vec<Vec<u8>>),
}

/// One-connection HTTP server for behaviour wiremock cannot script.
/// Returns a base url ending in `/v1`.
pub async fn raw_server(script: Script) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        read_request(&mut sock).await;
        match script {
            Script::Silent => {}
            Script::StreamThenStall(chunks) => {
                let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
                if write_chunks(&mut sock, head, chunks).await.is_err() {
                    return;
                }
            }
            Script::StreamThenClose(chunks) => {
                let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: 5000\r\n\r\n";
                let _ = write_chunks(&mut sock, head, chunks).await;
                return;
            }
        }
        tokio::time::sleep(Duration::from_secs(3600)).await;
        drop(sock);
    });
    format!("http://{addr}/v1")
}

async fn write_chunks(sock: &mut TcpStream, head: &str, chunks: Vec<Vec<u8>>) -> std::io::Result<()> {
    sock.write_all(head.as_bytes()).await?;
    for chunk in chunks {
        sock.write_all(&chunk).await?;
        sock.flush().await?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let len = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + len {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
