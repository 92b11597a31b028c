//! Sealbox Namespace Admin CLI
//!
//! Offline administrative commands for the namespace database: inspect
//! its contents or remove it entirely. Operates directly on the database
//! file, so the server must not be running.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sealbox_common::NamespaceStoreConfig;
use sealbox_namespace::{NamespaceStore, RedbBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// File name of the namespace database inside the data directory.
const NAMESPACE_DB_FILE: &str = "namespaces.redb";

#[derive(Parser, Debug)]
#[command(name = "sealbox-nsadmin")]
#[command(about = "Sealbox Namespace Admin CLI")]
#[command(version)]
struct Args {
    /// Data directory holding the namespace database
    #[arg(short, long, default_value = "/var/lib/sealbox")]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every namespace as "path<TAB>id"
    List,
    /// Print one namespace record as JSON
    Get {
        /// Namespace path
        path: String,
    },
    /// Delete the namespace database
    Cleanup,
}

fn open_store(data_dir: &std::path::Path) -> Result<NamespaceStore> {
    let db_path = data_dir.join(NAMESPACE_DB_FILE);
    let backend = RedbBackend::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    NamespaceStore::open(
        Arc::new(backend),
        NamespaceStoreConfig::with_data_dir(data_dir),
    )
    .context("failed to open namespace store")
}

fn list_tree(store: &NamespaceStore, parent: &str) -> Result<()> {
    for (id, path) in store.list(parent)? {
        println!("{path}\t{id}");
        list_tree(store, path.as_str())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Commands::List => {
            let store = open_store(&args.data_dir)?;
            list_tree(&store, "")?;
        }
        Commands::Get { path } => {
            let store = open_store(&args.data_dir)?;
            match store.get(&path)? {
                Some(ns) => println!("{}", serde_json::to_string_pretty(&ns)?),
                None => anyhow::bail!("namespace not found: {path}"),
            }
        }
        Commands::Cleanup => {
            let db_path = args.data_dir.join(NAMESPACE_DB_FILE);
            if db_path.exists() {
                std::fs::remove_file(&db_path)
                    .with_context(|| format!("failed to remove {}", db_path.display()))?;
                println!("removed {}", db_path.display());
            } else {
                println!("nothing to clean up at {}", db_path.display());
            }
        }
    }

    Ok(())
}
