use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tower_http=debug,info")),
        )
        .compact()
        .init();

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    println!("🚀 Catalog stub running at http://{addr}/api/livros");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, livros_stub::router()).await?;

    Ok(())
}
