use std::net::SocketAddr;
use std::sync::Arc;

use agrimarket_backend::config::AppConfig;
use agrimarket_backend::store::MemStore;
use agrimarket_backend::{router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load()?;
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    log::info!(
        "categories: {:?}, token ttl: {}h",
        config.categories,
        config.token_ttl_hours
    );

    let state = AppState {
        store: Arc::new(MemStore::new()),
        http: reqwest::Client::new(),
        config: Arc::new(config),
    };

    log::info!("Starting server on {}", addr);
    let app = router(state);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
