// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::core::{ConfigManager, Database, LogNotifier, MemoryStore};
use crate::types::PositionId;
use crate::web::start_web_server;
use crate::workflow::{
    Collaborators, PositionStore, SampleCandidateSource, ScriptedExtractor, Workflow,
};

#[derive(Parser)]
#[command(name = "talentflow")]
#[command(about = "Conversational hiring workflow: positions, search plans and candidate review")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the configured SQLite database
    #[arg(long, global = true)]
    pub database_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,
    /// Walk one role description through the pipeline in memory
    Demo {
        text: String,
        /// Follow-up instruction applied to the preview
        #[arg(long)]
        refine: Option<String>,
    },
    /// Manage positions in the database
    Positions {
        #[command(subcommand)]
        command: PositionCommand,
    },
    /// Create the database and upload directories
    Init,
}

#[derive(Subcommand)]
pub enum PositionCommand {
    /// List all positions
    List,
    /// Create a new position
    Create {
        title: String,
        #[arg(default_value = "")]
        organization: String,
    },
    /// Delete a position by id
    Delete { id: String },
}

pub async fn run(cli: Cli, mut config: ConfigManager) -> Result<()> {
    if let Some(path) = cli.database_path {
        config.environment.database_path = path;
    }

    match cli.command {
        Command::Serve => start_web_server(config).await,
        Command::Demo { text, refine } => run_demo(&config, &text, refine.as_deref()).await,
        Command::Positions { command } => run_positions(&config, command).await,
        Command::Init => {
            config.ensure_directories().await?;
            let database = Database::new(&config.environment.database_path).await?;
            database.health_check().await?;
            println!(
                "Initialized {} and {}",
                config.environment.database_path.display(),
                config.environment.upload_path.display()
            );
            Ok(())
        }
    }
}

async fn run_demo(config: &ConfigManager, text: &str, refine: Option<&str>) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let extractor = ScriptedExtractor::new(&config.pipeline);
    let margin = Duration::from_millis(100);
    let (initial, refine_delay) = (extractor.initial_duration(), extractor.refine_duration());

    let workflow = Workflow::new(
        Collaborators {
            store: store.clone(),
            blobs: store,
            notifier: Arc::new(LogNotifier),
            extractor: Arc::new(extractor),
            source: Arc::new(SampleCandidateSource),
        },
        config.pipeline.confirmation_message.clone(),
    );

    let id = workflow.create_position("", "").await?.position.id;
    workflow.submit_input(&id, text, None).await?;
    info!("Waiting {:?} for the search plan", initial);
    tokio::time::sleep(initial + margin).await;

    if let Some(instruction) = refine {
        workflow.refine(&id, instruction).await?;
        tokio::time::sleep(refine_delay + margin).await;
    }

    for turn in workflow.conversation(&id).await {
        println!("[{:?}] {}", turn.kind(), turn.body.display_text());
    }

    let plan = workflow
        .current_plan(&id)
        .await
        .context("No search plan was produced")?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn run_positions(config: &ConfigManager, command: PositionCommand) -> Result<()> {
    config.ensure_directories().await?;
    let database = Database::new(&config.environment.database_path).await?;
    let positions = PositionStore::new(Arc::new(database), Arc::new(LogNotifier));

    match command {
        PositionCommand::List => {
            let all = positions.refresh().await?;
            if all.is_empty() {
                println!("No positions");
            }
            for position in all {
                println!(
                    "{}  {:<12} {} ({})",
                    position.id,
                    position.status.as_str(),
                    position.title,
                    position.organization
                );
            }
        }
        PositionCommand::Create {
            title,
            organization,
        } => {
            let id = positions.create(&title, &organization).await?;
            println!("Created position {}", id);
        }
        PositionCommand::Delete { id } => {
            positions.delete(&PositionId::from(id.as_str())).await?;
            println!("Deleted position {}", id);
        }
    }
    Ok(())
}
