use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    log::info!(
        "mock OZmap listening on http://{addr} (key '{}', login '{}')",
        mock_server::API_KEY,
        mock_server::LOGIN
    );
    mock_server::run(listener).await
}
