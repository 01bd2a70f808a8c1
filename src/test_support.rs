//! Local HTTP stub shared by the fetcher and notifier tests

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Minimal HTTP/1.1 server: `respond` maps the raw request (head and body)
/// to a status and body. Returns the base URL.
pub async fn spawn_stub<F>(respond: F) -> String
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    spawn_stalling_stub(|_| None, respond).await
}

/// Like `spawn_stub`, but waits `stall(request)` before answering
pub async fn spawn_stalling_stub<S, F>(stall: S, respond: F) -> String
where
    S: Fn(&str) -> Option<Duration> + Send + Sync + 'static,
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stall = Arc::new(stall);
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let stall = stall.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    if let Some(end) = header_end(&buf) {
                        let head = String::from_utf8_lossy(&buf[..end]).to_string();
                        if buf.len() >= end + content_length(&head) {
                            break;
                        }
                    }
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&buf).to_string();
                if let Some(delay) = stall(&request) {
                    tokio::time::sleep(delay).await;
                }
                let (status, body) = respond(&request);
                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                // The client may already have given up on a stalled reply
                if socket.write_all(reply.as_bytes()).await.is_ok() {
                    socket.shutdown().await.ok();
                }
            });
        }
    });

    format!("http://{}", addr)
}
