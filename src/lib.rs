pub mod actions;
pub mod api;
pub mod chat; // Consultation message queue
pub mod config;
pub mod directory;
pub mod pipeline;
pub mod report; // Text/PDF report export

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::actions::Actions;
use crate::api::{start_api_server, ApiContext};
use crate::config::{AppConfig, ConfigError};
use crate::directory::StaticHealthCenterDirectory;
use crate::pipeline::flows::ollama_types::OllamaError;
use crate::pipeline::flows::OllamaClient;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot create Ollama client: {0}")]
    Ollama(#[from] OllamaError),

    #[error("Cannot start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("{0}")]
    Server(String),
}

pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    tracing::info!(
        ollama = %config.ollama_url,
        model = %config.model,
        timeout_secs = config.flow_timeout.as_secs(),
        "Configuration loaded"
    );

    // The blocking reqwest client must be created and dropped outside the runtime.
    let model = Arc::new(OllamaClient::from_config(&config)?);
    let directory = Arc::new(StaticHealthCenterDirectory::with_default_centers());
    let actions = Actions::from_config(model.clone(), directory, &config);
    let ctx = ApiContext::new(actions, config.export_dir.clone(), &config.model);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async move {
        let mut server = start_api_server(ctx, config.bind_addr)
            .await
            .map_err(StartupError::Server)?;
        tracing::info!(addr = %server.addr, "Seva Health API listening");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok(())
    });

    drop(runtime);
    drop(model);
    result
}
