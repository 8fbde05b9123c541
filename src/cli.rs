//! CLI interface for reply-tuner

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::error::EngineError;
use crate::learning::{self, ImprovementEngine};
use crate::store;

#[derive(Parser)]
#[command(name = "reply-tuner")]
#[command(about = "Learns a consultant chatbot prompt from real conversation transcripts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,
    },
    /// Cut a transcript file into training samples
    Segment {
        /// Transcript JSON file (array of {"conversation": [...]})
        file: PathBuf,
        /// Print the first N samples as JSON
        #[arg(short, long, default_value = "0")]
        show: usize,
    },
    /// Run the improvement loop over a transcript file
    Train {
        /// Transcript JSON file
        file: PathBuf,
        /// Maximum number of samples to train on
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Inspect or change the active prompt
    Prompt {
        #[command(subcommand)]
        command: PromptCommands,
    },
    /// Create the prompt database schema
    InitDb {
        /// Database file (defaults to the configured one)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum PromptCommands {
    /// Print the active prompt
    Show,
    /// List recent prompt versions from the database
    History {
        /// Maximum versions to list
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Save prompt text from a file as the new active version
    Set {
        /// File holding the prompt text
        file: PathBuf,
    },
    /// Rewrite the active prompt from free-text instructions
    Instruct {
        /// Instructions, e.g. "be more concise"
        instructions: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            let mut config = Config::load()?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            crate::server::start(config).await?;
        }
        Commands::Segment { file, show } => {
            let samples = learning::segment_file(&file)?;
            println!("Extracted {} samples from {}", samples.len(), file.display());
            if show > 0 {
                let preview = &samples[..show.min(samples.len())];
                println!("{}", serde_json::to_string_pretty(preview)?);
            }
        }
        Commands::Train { file, limit } => {
            let config = Config::load()?;
            let samples = learning::segment_file(&file)?;
            if samples.is_empty() {
                println!("No samples found in {}", file.display());
                return Ok(());
            }

            let engine = ImprovementEngine::from_config(&config)?;
            let report = engine.train(&samples, limit).await;

            println!("Processed:      {}", report.processed);
            println!("Prompt changed: {}", report.changed);
            if report.busy > 0 {
                println!("Rate limited:   {}", report.busy);
            }
            println!("\n--- Final prompt ---\n{}", report.final_prompt);
        }
        Commands::Prompt { command } => {
            let config = Config::load()?;
            let engine = ImprovementEngine::from_config(&config)?;
            match command {
                PromptCommands::Show => {
                    println!("{}", engine.active_prompt());
                }
                PromptCommands::History { limit } => {
                    let versions = engine.store().history(limit);
                    if versions.is_empty() {
                        println!("No prompt history (database not configured or empty).");
                    }
                    for version in versions {
                        let first_line = version.text.lines().next().unwrap_or_default();
                        println!(
                            "{}  {:<13}  {}",
                            version.created_at.format("%Y-%m-%d %H:%M:%S"),
                            version.source.as_str(),
                            first_line
                        );
                    }
                }
                PromptCommands::Set { file } => {
                    let text = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    engine.direct_save(&text)?;
                    println!("Prompt saved.");
                }
                PromptCommands::Instruct { instructions } => {
                    match engine.apply_instructions(&instructions).await {
                        Ok(updated) => println!("{}", updated),
                        Err(EngineError::GenerationFailed(sentinel)) => bail!(sentinel),
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
        Commands::InitDb { path } => {
            let path = match path {
                Some(path) => path,
                None => Config::load()?
                    .storage
                    .database_path
                    .context("No database configured. Set DATABASE_URL or pass --path.")?,
            };
            if store::init_schema(&path)? {
                println!("Created prompt database at {}", path.display());
            } else {
                println!("Prompt database at {} is up to date", path.display());
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show_config()?,
        },
    }

    Ok(())
}
