#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the AIS map engine.
//!
//! One-shot commands run migrations, print an assembled selection as JSON
//! or list recent destinations. Without a command the user picks a tool
//! interactively.

use std::collections::BTreeSet;

use ais_map_database::{PostgresStore, ReportStore as _, SelectionCache, run_migrations};
use ais_map_database_models::{BoundingBox, SelectionFilter, TimeRange};
use ais_map_dataset::{AssembleMode, assemble_from_store};
use ais_map_server::EngineConfig;
use ais_map_server_models::ApiDestinations;
use ais_map_vessel_models::{Mmsi, parse_mmsi_list};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dialoguer::Select;

#[derive(Parser)]
#[command(name = "ais_map_cli", about = "AIS map engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Select reports and print the assembled rows as JSON
    Select {
        /// Start of the reporting window (RFC 3339)
        #[arg(long)]
        from: DateTime<Utc>,
        /// End of the reporting window (RFC 3339)
        #[arg(long)]
        to: DateTime<Utc>,
        /// Zone as `west,south,east,north`
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        bbox: Option<Vec<f64>>,
        /// Nine-digit MMSIs separated by commas or spaces
        #[arg(long)]
        mmsis: Option<String>,
        /// Start of the trajectory window; selects vessels first, then
        /// their reports in this window
        #[arg(long, requires = "to2")]
        from2: Option<DateTime<Utc>>,
        /// End of the trajectory window
        #[arg(long, requires = "from2")]
        to2: Option<DateTime<Utc>>,
        /// Keep only the latest report of each vessel
        #[arg(long)]
        latest: bool,
    },
    /// Print the most recent declared destinations of some vessels
    Destinations {
        /// Start of the window (RFC 3339)
        #[arg(long)]
        from: DateTime<Utc>,
        /// End of the window (RFC 3339)
        #[arg(long)]
        to: DateTime<Utc>,
        /// Nine-digit MMSIs separated by commas or spaces
        mmsis: String,
    },
    /// Start the API server
    Serve,
}

/// Interactive tool selection.
enum Tool {
    Server,
    Migrate,
}

impl Tool {
    const ALL: &[Self] = &[Self::Server, Self::Migrate];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Server => "Start server",
            Self::Migrate => "Run database migrations",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => match pick_tool()? {
            Tool::Server => return serve(true).await,
            Tool::Migrate => Commands::Migrate,
        },
    };

    // the server installs its own logger
    if !matches!(command, Commands::Serve) {
        pretty_env_logger::init();
    }

    match command {
        Commands::Serve => serve(false).await?,
        Commands::Migrate => {
            log::info!("Running database migrations...");
            let store = PostgresStore::connect_from_env().await?;
            run_migrations(store.database()).await?;
            log::info!("Migrations complete.");
        }
        Commands::Select {
            from,
            to,
            bbox,
            mmsis,
            from2,
            to2,
            latest,
        } => {
            let mut filter = SelectionFilter::new(TimeRange::new(from, to));
            if let Some(bbox) = bbox {
                let [west, south, east, north] = bbox[..] else {
                    return Err("--bbox expects west,south,east,north".into());
                };
                filter = filter.with_bbox(BoundingBox::try_new(west, south, east, north)?);
            }
            if let Some(list) = mmsis {
                filter = filter.with_mmsis(parse_mmsi_list(&list)?);
            }
            if let (Some(start), Some(end)) = (from2, to2) {
                filter = filter.with_trajectory_range(TimeRange::new(start, end));
            }

            let mode = if latest {
                AssembleMode::Latest
            } else {
                AssembleMode::All
            };

            let config = EngineConfig::load()?;
            let store = PostgresStore::connect_from_env().await?;
            let cache = SelectionCache::new();
            let dataset =
                assemble_from_store(&store, &cache, &filter, mode, &config.dataset).await?;

            log::info!(
                "Selected {} reports of {} vessels",
                dataset.enriched.len(),
                dataset.identifiers.len()
            );
            println!("{}", serde_json::to_string_pretty(&dataset.enriched)?);
        }
        Commands::Destinations { from, to, mmsis } => {
            let mmsis: BTreeSet<Mmsi> = parse_mmsi_list(&mmsis)?;
            let store = PostgresStore::connect_from_env().await?;
            let rows = store.destinations(&TimeRange::new(from, to), &mmsis).await?;

            for vessel in ApiDestinations::group(rows) {
                println!("{}: {}", vessel.mmsi, vessel.destinations.join(", "));
            }
        }
    }

    Ok(())
}

fn pick_tool() -> Result<&'static Tool, dialoguer::Error> {
    println!("AIS Map Tools");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(&Tool::ALL[idx])
}

/// Runs the server on actix-web's own runtime.
async fn serve(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    // The server uses actix-web's runtime, so we need to run it
    // in a blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        let system = actix_web::rt::System::new();
        if interactive {
            system.block_on(ais_map_server::interactive::run())
        } else {
            system.block_on(ais_map_server::run_server())
        }
    })
    .await??;

    Ok(())
}
