//! TaskTree CLI - REST server and command line interface for hierarchical tasks

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tasktree_cli::{logging::init_logging, run_command, server, Cli, Commands};
use tasktree_core::{ConfigLoader, TaskTreeConfig, TaskTreeDatabase};

/// Apply command line overrides on top of file and environment settings
fn apply_cli_overrides(config: &mut TaskTreeConfig, cli: &Cli) {
    if let Some(database) = &cli.database {
        config.database_path.clone_from(database);
    }
    if let Commands::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load().context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    let _log_guard = init_logging(&config.logging, cli.verbose)?;

    let db = TaskTreeDatabase::new_with_config(&config.database_path, config.pool_config())
        .await
        .with_context(|| {
            format!(
                "Failed to open database at {}",
                config.database_path.display()
            )
        })?
        .with_validation(config.validation);

    match &cli.command {
        Commands::Serve { .. } => {
            let state = server::AppState::new(Arc::new(db));
            #[cfg(feature = "observability")]
            let state = {
                let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
                    .install_recorder()
                    .context("Failed to install metrics recorder")?;
                tracing::info!("Prometheus metrics recorder installed");
                state.with_metrics(handle)
            };
            server::serve(state, &config.bind_address()).await?;
        }
        command => {
            run_command(&db, command, &mut std::io::stdout()).await?;
        }
    }

    Ok(())
}
