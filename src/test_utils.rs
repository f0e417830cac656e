//! Local TCP servers with deterministic timing for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts connections and never answers, so every request times out.
pub struct SilentServer {
    url: String,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl SilentServer {
    pub async fn start() -> Self {
        StallingServer::start(usize::MAX).await.0
    }

    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Number of connections accepted so far. Each attempt opens its own.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Holds the first `stalled` connections open without answering, then
/// replies `200 OK` to everything after.
pub struct StallingServer(SilentServer);

impl StallingServer {
    pub async fn start(stalled: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);

        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut stream, _)) = listener.accept().await {
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                if seen < stalled {
                    held.push(stream);
                    continue;
                }
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    let _ = stream
                        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                        .await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self(SilentServer {
            url,
            connections,
            task,
        })
    }

    pub fn url(&self) -> String {
        self.0.url()
    }

    pub fn connections(&self) -> usize {
        self.0.connections()
    }
}
