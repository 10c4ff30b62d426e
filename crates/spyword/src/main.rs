//! `spyword` binary: loads configuration and serves until Ctrl-C.
//!
//! ```text
//! spyword [CONFIG.toml]
//! ```
//!
//! The config path may also come from `SPYWORD_CONFIG`. `SPYWORD_BIND` or
//! `PORT` override the bind address; `RUST_LOG` controls log output.

use spyword::{ServerConfig, SpywordError, SpywordServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SpywordError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SPYWORD_CONFIG").ok());

    let config = match config_path {
        Some(path) => {
            tracing::info!(%path, "loading config");
            ServerConfig::load(&path)?
        }
        None => ServerConfig::default(),
    }
    .with_env_overrides();

    let server = SpywordServer::builder().config(config).build().await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
