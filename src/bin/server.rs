use env_logger::Env;
use log::{error, info, warn};

use rusty_chat::config::ServerConfig;
use rusty_chat::core::ChatServer;

#[tokio::main]
async fn main() {
    // Load .env before reading RUST_LOG
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging; join/leave events are logged at info
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match dotenv_result {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Load config from .env
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);

    let server = match ChatServer::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Server started on port: {}", config.port);
    server.run().await;
}
