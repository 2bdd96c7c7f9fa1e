use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tokio::io::AsyncReadExt;

use state_pipeline::{LayerStatus, StatePipeline};
use state_server::{ServerConfig, StateServer};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(&cli.global, args).await,
        Command::Save(args) => cmd_save(&cli.global, args).await,
        Command::Load(args) => cmd_load(&cli.global, args).await,
    }
}

/// Defaults, then the config file, then the environment, then flags.
pub fn resolve_config(
    global: &GlobalArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match &global.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.apply_vars(lookup)?;

    if let Some(root) = &global.root {
        config.storage_root = root.clone();
    }
    if let Some(bucket) = &global.state_bucket {
        config.pipeline.state_bucket = bucket.clone();
    }
    if let Some(bucket) = &global.layer_bucket {
        config.pipeline.layer_bucket = bucket.clone();
    }
    tracing::debug!(
        root = %config.storage_root.display(),
        state_bucket = %config.pipeline.state_bucket,
        layer_bucket = %config.pipeline.layer_bucket,
        "resolved configuration"
    );
    Ok(config)
}

fn open_server(config: ServerConfig) -> anyhow::Result<StateServer> {
    StateServer::with_local_storage(config).context("invalid configuration")
}

fn pipeline(global: &GlobalArgs) -> anyhow::Result<Arc<StatePipeline>> {
    let config = resolve_config(global, |name| std::env::var(name).ok())?;
    Ok(open_server(config)?.pipeline().clone())
}

async fn cmd_serve(global: &GlobalArgs, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = resolve_config(global, |name| std::env::var(name).ok())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.public_url {
        config.public_base_url = Some(url);
    }
    println!(
        "State server on {} (root: {})",
        config.bind_addr.to_string().bold(),
        config.storage_root.display()
    );
    open_server(config)?.serve().await?;
    Ok(())
}

async fn cmd_save(global: &GlobalArgs, args: SaveArgs) -> anyhow::Result<()> {
    let raw = if args.file.as_os_str() == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("reading stdin")?;
        buf
    } else {
        tokio::fs::read(&args.file)
            .await
            .with_context(|| format!("reading {}", args.file.display()))?
    };

    let receipt = pipeline(global)?.save(&raw, args.user.as_deref()).await?;

    println!("{} Saved state {}", "✓".green().bold(), receipt.id().to_string().yellow());
    println!(
        "  Size: {} bytes ({} stored)",
        receipt.raw_size, receipt.stored_size
    );
    for outcome in &receipt.layers.outcomes {
        let status = match &outcome.status {
            LayerStatus::Applied => "applied".green(),
            LayerStatus::NoOp => "no-op".dimmed(),
            LayerStatus::Failed(reason) => format!("failed: {reason}").red(),
        };
        println!("  Layer {} {}: {}", outcome.action, outcome.name.bold(), status);
    }
    Ok(())
}

async fn cmd_load(global: &GlobalArgs, args: LoadArgs) -> anyhow::Result<()> {
    let loaded = pipeline(global)?.load_with_attribution(&args.id).await?;
    if args.show_user {
        let user = loaded.attribution.as_deref().unwrap_or("unknown");
        eprintln!("Generated by user: {}", user.cyan());
    }
    println!("{}", serde_json::to_string_pretty(&loaded.document)?);
    Ok(())
}
