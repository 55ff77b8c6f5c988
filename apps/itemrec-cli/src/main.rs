mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;

use itemrec_core::config::Config;
use itemrec_engine::api::{self, RecommendRequest};
use itemrec_engine::{ApiError, AppContext};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    // Keywords needs neither catalog nor model.
    if let Commands::Keywords { text, top } = &cli.command {
        return print_json(&api::keywords(text, *top), cli.pretty);
    }

    let config = Config::load()?;
    let mut settings = config.settings()?;
    if let Some(path) = &cli.catalog {
        settings.catalog.path = path.clone();
    }
    // Skipped rows are already logged by the catalog loader.
    let (ctx, _report) = AppContext::from_settings(settings).context("failed to initialize application context")?;

    match cli.command {
        Commands::Recommend { query, filter } => {
            let filter = filter
                .map(|f| serde_json::from_str(&f).context("--filter must be a JSON object"))
                .transpose()?;
            let resp = api::recommend(&ctx, RecommendRequest { query, limit: cli.limit, filter }).await;
            print_result(resp, cli.pretty)
        }
        Commands::Similar { item_id } => print_result(api::similar(&ctx, &item_id, cli.limit).await, cli.pretty),
        Commands::Category { category } => print_json(&api::category(&ctx, &category, cli.limit), cli.pretty),
        Commands::Cluster { k } => print_result(api::cluster(&ctx, k).await, cli.pretty),
        Commands::Stats => print_json(&api::stats(&ctx), cli.pretty),
        Commands::Status => print_json(&api::status(&ctx), cli.pretty),
        Commands::Populate { batch_size, no_progress } => {
            let client = ctx.remote.clone().ok_or_else(|| anyhow!("remote.host is not configured"))?;
            let mut opts = ctx.populate_options();
            if let Some(size) = batch_size {
                opts.batch_size = size;
            }
            opts.show_progress = !no_progress;
            let report = ctx.populate_remote(&client, opts).await?;
            print_json(&report, cli.pretty)
        }
        Commands::IndexStats => {
            let client = ctx.remote.as_ref().ok_or_else(|| anyhow!("remote.host is not configured"))?;
            print_json(&client.describe_stats().await?, cli.pretty)
        }
        Commands::Keywords { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{out}");
    Ok(())
}

/// Failures print their error body before the process exits non-zero.
fn print_result<T: Serialize>(result: Result<T, ApiError>, pretty: bool) -> Result<()> {
    match result {
        Ok(value) => print_json(&value, pretty),
        Err(e) => {
            print_json(&e.body(), pretty)?;
            Err(anyhow!(e))
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing subscriber: {e}"))?;
    Ok(())
}
