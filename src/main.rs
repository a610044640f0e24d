//! VTN entry point: CLI wiring, config loading and API server startup.

use std::error::Error;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vtn_fleet::cli::Cli;
use vtn_fleet::config::VtnConfig;
use vtn_fleet::dr::{EventCoordinator, LoopbackDispatcher};
use vtn_fleet::fleet::{FleetRegistry, JsonFileStore};
use vtn_fleet::io::export::export_csv;
use vtn_fleet::vtn::Vtn;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> VtnConfig {
    let mut config = match &cli.config {
        Some(path) => VtnConfig::from_toml_file(path).unwrap_or_else(|e| {
            error!("{e}");
            process::exit(1);
        }),
        None => VtnConfig::default(),
    };
    cli.apply(&mut config);

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("{e}");
        }
        process::exit(1);
    }
    config
}

async fn run(cli: Cli, config: VtnConfig) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(JsonFileStore::new(&config.registry.data_dir));
    let registry = Arc::new(FleetRegistry::open(store, config.registry.settings()).await?);

    if let Some(path) = &cli.export_fleet {
        export_csv(&registry.list_all_with_quality().await, path)?;
        info!(path = %path.display(), "fleet written");
        return Ok(());
    }

    let dispatcher = Arc::new(LoopbackDispatcher::new());
    let coordinator = Arc::new(EventCoordinator::new(dispatcher, config.dispatch.timeout()));
    let vtn = Arc::new(Vtn::new(
        config.server.vtn_id.clone(),
        Arc::clone(&registry),
        coordinator,
    ));
    info!(vtn_id = vtn.vtn_id(), "VTN started");

    #[cfg(feature = "api")]
    {
        let ip: std::net::IpAddr = config.server.bind.parse()?;
        let addr = std::net::SocketAddr::new(ip, config.server.port);
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for shutdown signal");
            }
            info!("shutdown requested");
        };
        vtn_fleet::api::serve(vtn, addr, shutdown).await?;
    }
    #[cfg(not(feature = "api"))]
    {
        drop(vtn);
        tokio::signal::ctrl_c().await?;
    }

    registry.close().await?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let config = load_config(&cli);

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        error!("failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(run(cli, config)) {
        error!("{e}");
        process::exit(1);
    }
}
