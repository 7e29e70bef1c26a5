//! Helpers shared by the unit tests.

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use url::Url;

/// Base URL of a fresh in-memory catalog.
pub async fn stub_base_url() -> Url {
    let addr = livros_stub::spawn().await.unwrap();
    Url::parse(&format!("http://{addr}/api/livros")).unwrap()
}

/// A URL on a port nothing listens on.
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/api/livros")).unwrap()
}

/// Answers every connection with the same canned HTTP response.
pub async fn serve_raw(response: &'static str) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    Url::parse(&format!("http://{addr}/api/livros")).unwrap()
}
