use anyhow::{Context, Result};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

mod http;
mod sensor;
mod store;

use store::CsvStore;

#[derive(Debug)]
struct GlobalConfig {
    csv_path: PathBuf,
    bind_addr: SocketAddr,
}

impl GlobalConfig {
    const CSV_FILE_PATH_ENV_VAR: &'static str = "CSV_FILE_PATH";
    const BIND_ADDR_ENV_VAR: &'static str = "BIND_ADDR";

    const DEFAULT_CSV_PATH: &'static str = "data.csv";
    const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:5000";

    fn from_env() -> Result<Self> {
        // A missing .env file is fine; plain env vars work too. Anything
        // else (unreadable file, bad line) is a real configuration error.
        match dotenv::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).context("loading .env file"),
        }

        let csv_path = PathBuf::from(
            dotenv::var(Self::CSV_FILE_PATH_ENV_VAR)
                .unwrap_or_else(|_| Self::DEFAULT_CSV_PATH.to_string()),
        );

        let bind_addr = dotenv::var(Self::BIND_ADDR_ENV_VAR)
            .unwrap_or_else(|_| Self::DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("parsing bind address")?;

        Ok(Self {
            csv_path,
            bind_addr,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = GlobalConfig::from_env()?;
    log::info!("Starting with {config:?}");

    let store = Arc::new(CsvStore::new(config.csv_path.clone()));
    store
        .ensure_header()
        .await
        .context("preparing backing store")?;

    let app = http::router(store);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    log::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
