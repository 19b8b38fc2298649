use guarded_traversal::adapters::inbound::FilesystemAreaSource;
use guarded_traversal::adapters::outbound::{
    init_buffered_logger, init_combined_logger, init_console_logger, SimulatedWorld,
};
use guarded_traversal::application::TraversalService;
use guarded_traversal::domains::logger::DynLogger;
use guarded_traversal::domains::traversal::{Collaborators, SystemClock};
use guarded_traversal::Config;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting guarded traversal");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = match Config::from_file(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {}, using defaults", config_path, e);
            Config::default()
        }
    };
    info!("Areas directory: {}", config.areas.directory.display());

    let base_logger = match &config.logging.file {
        Some(path) => init_combined_logger(path, &config.logging.level),
        None => init_console_logger(),
    };
    let logger: DynLogger = if config.logging.buffer_capacity > 0 {
        init_buffered_logger(base_logger, config.logging.buffer_capacity) as DynLogger
    } else {
        base_logger
    };

    let world = Arc::new(SimulatedWorld::new(config.simulation.clone(), Arc::new(SystemClock)));
    let collaborators = Collaborators::from_world(world);
    let source = FilesystemAreaSource::new(Some(config.areas.directory.clone()));
    let mut service = TraversalService::from_config(&config, &source, collaborators, logger)?;
    let commands = service.command_sender();

    let shutdown = Arc::new(AtomicBool::new(false));
    let loop_shutdown = shutdown.clone();
    let control_loop = tokio::task::spawn_blocking(move || {
        let ticks = service.run_until(&loop_shutdown);
        (ticks, service.statistics().total_completed())
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down guarded traversal");
    if let Err(e) = commands.stop() {
        warn!("{}", e);
    }
    shutdown.store(true, Ordering::SeqCst);

    let (ticks, completed) = control_loop.await?;
    info!("Control loop exited after {} ticks, {} completed run(s)", ticks, completed);
    Ok(())
}
