use fileserver::{FileServerApi, ServerConfig, ServerState};
use tracing_subscriber::EnvFilter;

/// Set up tracing from `RUST_LOG` (default `info`); `LOG_FORMAT=json` for JSON lines
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> fileserver::Result<()> {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();

    init_logging();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let state = match ServerState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Cannot serve from {}: {}", config.root.display(), e);
            return Err(e.into());
        }
    };

    tracing::info!("Streaming chunk size: {} bytes", state.chunk_size());

    FileServerApi::new(state)
        .serve(&config.host, config.port)
        .await
}
