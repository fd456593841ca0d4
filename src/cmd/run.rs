//! `hopper run`: start the gateway.
//!
//! Loads the config file (if any), applies CLI overrides, picks the
//! destination directory, and serves the Axum router until SIGTERM or
//! Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::broadcast::Hub;
use crate::cli::RunArgs;
use crate::config::model::Config;
use crate::config::{self, validation};
use crate::directory::memory::MemoryDirectory;
use crate::directory::Directory;
use crate::error::HopperError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), HopperError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let config = load_config(&args).await?;
    let directory = open_directory(&args, &config).await?;
    let destination_count = directory.list().await.map_or(0, |d| d.len());

    let hub = Arc::new(Hub::new(config.broadcast.queue));
    let state = Arc::new(AppState::new(
        Arc::clone(&directory),
        hub,
        config.defaults.clone(),
    ));
    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        directory = directory.name(),
        destinations = destination_count,
        timeout_ms = config.defaults.timeout,
        "hopper started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("hopper stopped");
    Ok(())
}

async fn load_config(args: &RunArgs) -> Result<Config, HopperError> {
    let mut config = match config::resolve_source(args.config.as_deref()).await? {
        Some(source) => {
            let config = source.load().await?;
            tracing::info!(
                source = source.name(),
                destinations = config.destinations.len(),
                "config loaded"
            );
            config
        }
        None => {
            tracing::warn!(
                "no config file found, starting with an empty directory \
                 (run 'hopper init' to create one)"
            );
            Config::default()
        }
    };

    apply_overrides(args, &mut config);
    validation::validate(&config).map_err(|errors| HopperError::ConfigValidation { errors })?;
    Ok(config)
}

fn apply_overrides(args: &RunArgs, config: &mut Config) {
    if let Some(timeout) = args.timeout {
        config.defaults.timeout = timeout;
    }
    if let Some(queue) = args.broadcast_queue {
        config.broadcast.queue = queue;
    }
}

#[cfg_attr(not(feature = "mongodb"), allow(clippy::unused_async))]
async fn open_directory(
    args: &RunArgs,
    config: &Config,
) -> Result<Arc<dyn Directory>, HopperError> {
    #[cfg(feature = "mongodb")]
    if let Some(ref url) = args.mongodb_url {
        let mongo =
            crate::directory::mongodb::MongoDirectory::connect(url, &args.mongodb_database)
                .await?;
        if !config.destinations.is_empty() {
            tracing::warn!(
                ignored = config.destinations.len(),
                "config file destinations are ignored when MongoDB is the directory"
            );
        }
        return Ok(Arc::new(mongo));
    }

    #[cfg(not(feature = "mongodb"))]
    let _ = args;

    Ok(Arc::new(MemoryDirectory::from_config(&config.destinations)))
}
