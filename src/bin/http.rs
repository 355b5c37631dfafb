#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use game_scheduler::{AppConfig, InMemoryStore, Scheduler, http_api};
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("game_scheduler=info,http=info")),
        )
        .init();

    let config = AppConfig::load()?;
    let addr = config.server.socket_addr()?;

    let scheduler = match &config.server.database {
        #[cfg(feature = "sqlite")]
        Some(path) => {
            info!(path = %path.display(), "using sqlite store");
            let store = Arc::new(game_scheduler::SqliteStore::new(path)?);
            Scheduler::with_store(store, config.engine.clone())
        }
        #[cfg(not(feature = "sqlite"))]
        Some(path) => {
            return Err(format!(
                "database {} configured but the `sqlite` feature is disabled",
                path.display()
            )
            .into());
        }
        None => {
            info!("using in-memory store");
            Scheduler::with_store(Arc::new(InMemoryStore::new()), config.engine.clone())
        }
    };

    let state = http_api::AppState::new(scheduler, config.server.default_owner.clone());
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
