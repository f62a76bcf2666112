use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tabdash::server::{self, AppState};
use tabdash::{AppConfig, Args, ConfigManager, Datasets, SessionSettings};
use tracing_subscriber::EnvFilter;

/// Handles flags that do their work and exit without starting the server.
fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(tabdash::APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Configuration written to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error generating config: {}", e);
                std::process::exit(1);
            }
        }
    }
    Ok(None)
}

/// RUST_LOG wins; otherwise the configured level, otherwise info.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.logging.level.as_deref().unwrap_or("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: AppConfig) -> Result<()> {
    let datasets = Datasets::load(&config.data).wrap_err("Failed to load startup datasets")?;
    let state = AppState::new(Arc::new(datasets), SessionSettings::from_config(&config))
        .with_idle_timeout(Duration::from_secs(config.server.session_idle_secs));
    let addr = config.bind_addr();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to start the async runtime")?;
    runtime
        .block_on(server::serve(&addr, state))
        .wrap_err_with(|| format!("Server on {} stopped", addr))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let mut config = AppConfig::load(tabdash::APP_NAME)?;
    config.apply_args(&args);
    config.validate()?;
    init_tracing(&config);

    if let Err(e) = run(config) {
        tracing::error!(error = %e, "tabdash exited");
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}
