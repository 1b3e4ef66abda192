use mock_server::{sample_claims, AppState, DEFAULT_TOKEN};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let token = std::env::var("API_TOKEN").unwrap_or_else(|_| DEFAULT_TOKEN.to_string());
    let seed = std::env::var("SEED_CLAIMS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(23);

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, seed, "listening");
    mock_server::run(listener, AppState::new(token, sample_claims(seed))).await
}
