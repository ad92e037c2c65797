//! The facilitator ingests batches of staking bridge events and accepts the stake requests in them.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use config::Config;
use constants::{DB_NAME, DEFAULT_THREAD_COUNT};
use facilitator::{
    handler_factory::HandlerFactory, secret::RandomSecretGenerator,
    transaction_handler::TransactionHandler,
};
use facilitator_common::logging::{self, LoggerConfig};
use facilitator_db::repositories::Repositories;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::{runtime, task::JoinHandle};
use tracing::{debug, info, trace};

mod args;
mod config;
mod ingest;

mod constants;

fn main() -> anyhow::Result<()> {
    logging::init(LoggerConfig::from_env("facilitator"))?;

    let cli = args::Cli::parse();
    info!(config = %cli.config.display(), batches = cli.batches.len(), "starting facilitator");

    let config = parse_toml::<Config>(&cli.config)?;

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    runtime.block_on(run(config, cli.batches))?;

    info!("facilitator shutdown complete");

    Ok(())
}

async fn run(config: Config, batch_files: Vec<PathBuf>) -> anyhow::Result<()> {
    let repos = init_repositories(&config).await?;
    let watchers = spawn_watchers(&repos).await;

    let handlers = HandlerFactory::handlers(&repos, Arc::new(RandomSecretGenerator));
    let transaction_handler = TransactionHandler::new(handlers, repos);

    // batches must never overlap, so they are handled strictly one after the other
    for path in &batch_files {
        for (index, batch) in ingest::read_batches(path)?.into_iter().enumerate() {
            transaction_handler.handle(batch).await.with_context(|| {
                format!("failed to handle batch {index} of {}", path.display())
            })?;
            info!(path = %path.display(), %index, "handled batch");
        }
    }

    // dropping the last handle on the repositories ends the subscriptions
    drop(transaction_handler);
    for watcher in watchers {
        watcher.await.context("watcher panicked")?;
    }

    Ok(())
}

async fn init_repositories(config: &Config) -> anyhow::Result<Repositories> {
    let datadir = &config.datadir;
    if !datadir.exists() {
        fs::create_dir_all(datadir)
            .with_context(|| format!("could not create datadir at {}", datadir.display()))?;
    }

    let db_path = datadir.join(DB_NAME);
    let repos = Repositories::create_from_file(&db_path, config.db)
        .await
        .with_context(|| format!("could not open database at {}", db_path.display()))?;

    Ok(repos)
}

/// Logs every update the repositories notify about.
async fn spawn_watchers(repos: &Repositories) -> Vec<JoinHandle<()>> {
    let mut stake_requests = repos.stake_request_repository.subscribe().await;
    let mut messages = repos.message_repository.subscribe().await;

    vec![
        tokio::spawn(async move {
            while let Some(batch) = stake_requests.next().await {
                for stake_request in batch {
                    info!(
                        stake_request_hash = %stake_request.stake_request_hash,
                        accepted = stake_request.is_accepted(),
                        "stake request updated"
                    );
                }
            }
        }),
        tokio::spawn(async move {
            while let Some(batch) = messages.next().await {
                for message in batch {
                    info!(
                        message_hash = %message.message_hash,
                        source_status = %message.source_status,
                        target_status = %message.target_status,
                        "message updated"
                    );
                }
            }
        }),
    ]
}

/// Reads and parses a TOML file from the given path into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read TOML file {}", path.display()))?;
    trace!(?contents, "read file");

    let parsed = toml::from_str::<T>(&contents)
        .with_context(|| format!("failed to parse TOML file {}", path.display()))?;
    debug!(?parsed, "parsed TOML file");

    Ok(parsed)
}
