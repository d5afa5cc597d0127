use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod library;
mod semantic;
mod storage;

use config::Config;
use library::ZoteroApiSource;
use semantic::store::MetadataFilter;
use semantic::sync::{SyncMode, SyncOptions};
use semantic::{SemanticService, SyncOutcome, UpdateScheduler};

fn sync_mode(fulltext_flag: bool, config: &Config) -> SyncMode {
    if fulltext_flag || config.fulltext {
        SyncMode::FullText
    } else {
        SyncMode::Metadata
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .with_target(false)
        .init();

    let args = cli::Args::parse();

    let config = Config::load();
    let scheduler = UpdateScheduler::new(config.policy());
    let source = ZoteroApiSource::new(&config.zotero_url)?;

    let service = Arc::new(SemanticService::open(
        config.embedding.clone(),
        scheduler,
        PathBuf::from(config.base_path()),
        Box::new(source),
    )?);

    match args.command {
        cli::Command::Sync {
            fulltext,
            since,
            limit,
        } => {
            let since = since
                .map(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .with_context(|| format!("invalid --since timestamp '{s}'"))
                })
                .transpose()?;

            let options = SyncOptions {
                mode: sync_mode(fulltext, &config),
                force_rebuild: false,
                since,
                limit,
            };

            match service.sync(&options)? {
                SyncOutcome::Completed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report).unwrap());
                }
                SyncOutcome::AlreadyRunning => {
                    println!("A sync pass is already running");
                }
            }
            Ok(())
        }

        cli::Command::Rebuild { fulltext } => {
            let options = SyncOptions {
                mode: sync_mode(fulltext, &config),
                force_rebuild: true,
                ..Default::default()
            };

            match service.sync(&options)? {
                SyncOutcome::Completed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report).unwrap());
                }
                SyncOutcome::AlreadyRunning => {
                    println!("A sync pass is already running");
                }
            }
            Ok(())
        }

        cli::Command::Search {
            query,
            limit,
            item_type,
            tag,
        } => {
            // kick off a background pass if the policy says one is due;
            // the search below still answers from committed state
            let handle = service.spawn_scheduled_sync(SyncOptions {
                mode: sync_mode(false, &config),
                ..Default::default()
            });

            let filter = MetadataFilter { item_type, tag };
            let filter = (!filter.is_empty()).then_some(filter);

            let hits = service.search(
                &query,
                limit.unwrap_or(config.default_limit),
                filter.as_ref(),
            )?;
            println!("{}", serde_json::to_string_pretty(&hits).unwrap());

            if let Some(handle) = handle {
                let _ = handle.join();
            }
            Ok(())
        }

        cli::Command::Status {} => {
            let report = service.status();
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
            Ok(())
        }
    }
}
