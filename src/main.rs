// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Idea Board: a public board for sharing AI ideas
//!
//! Serves the board and its JSON API, and offers maintenance commands for
//! the idea store.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use ideaboard::config::AppConfig;
use ideaboard::db::Database;
use ideaboard::idea::{parse_tags, Idea, Submission};
use ideaboard::moderation::CompletionModerator;
use ideaboard::service::IdeaService;
use ideaboard::{IdeaBoardError, Result};

/// Client key used for submissions made from the command line
const CLI_CLIENT: &str = "cli";

/// Idea Board CLI
#[derive(Parser, Debug)]
#[command(name = "ideaboard")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Public AI idea board with moderated submissions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Browse or add ideas
    Ideas {
        #[command(subcommand)]
        action: IdeasCommands,
    },

    /// Ask the moderator about a piece of text
    Moderate {
        /// Content to review
        content: String,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show moderation service and database status
    Status,
}

#[derive(Subcommand, Debug)]
enum IdeasCommands {
    /// List visible ideas, newest first
    List {
        /// Only ideas carrying any of these comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,

        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Submit an idea through validation and moderation
    Submit {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        category: String,

        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,

        #[arg(long)]
        author: Option<String>,
    },

    /// Show a single idea, including hidden ones
    Show {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    /// Show database statistics
    Stats,

    /// Export every idea to JSON
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Hide an idea from the board
    Hide {
        id: String,

        /// Flag the idea as NSFW as well
        #[arg(long)]
        nsfw: bool,
    },

    /// Put a hidden idea back on the board
    Approve {
        id: String,
    },

    /// Vacuum database (reclaim space)
    Vacuum,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Serve { host, port }) => run_serve(config, host, port).await,
        Some(Commands::Ideas { action }) => run_ideas_command(config, action).await,
        Some(Commands::Moderate { content }) => run_moderate(config, content).await,
        Some(Commands::Db { action }) => run_db_command(config, action),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Status) => run_status(config).await,
        None => run_serve(config, None, None).await,
    }
}

/// Run the web server
async fn run_serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    let db = Database::open(&config.database.path)?;
    info!("Database: {}", config.database.path);

    ideaboard::web::start_server(config, db).await
}

fn print_idea(idea: &Idea) {
    println!(
        "{}  [{}] {}",
        idea.created_at.format("%Y-%m-%d"),
        idea.category,
        idea.title
    );
    println!("    {}", idea.description);
    if !idea.tags.is_empty() {
        println!("    tags: {}", idea.tags.join(", "));
    }
    println!("    by {}", idea.author_name.as_deref().unwrap_or("Anonymous"));
}

/// Run idea commands
async fn run_ideas_command(config: AppConfig, action: IdeasCommands) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    let service = IdeaService::from_config(&config, db)?;

    match action {
        IdeasCommands::List { tags, format } => {
            let selected = tags.as_deref().map(parse_tags).unwrap_or_default();
            let ideas = service.list(&selected)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&ideas)?);
            } else if ideas.is_empty() {
                println!("No ideas found");
            } else {
                for idea in &ideas {
                    print_idea(idea);
                }
                println!("\n{} ideas", ideas.len());
            }
        }
        IdeasCommands::Submit {
            title,
            description,
            category,
            tags,
            author,
        } => {
            let submission = Submission {
                title,
                description,
                category,
                tags: parse_tags(&tags),
                author_name: author,
            };
            match service.submit(CLI_CLIENT, submission).await {
                Ok(idea) => {
                    println!("Published idea {}", idea.id);
                    print_idea(&idea);
                }
                Err(IdeaBoardError::Validation(errors)) => {
                    eprintln!("Please fix the following issues:");
                    for error in &errors {
                        eprintln!("  - {}", error);
                    }
                    return Err(IdeaBoardError::Validation(errors));
                }
                Err(e) => return Err(e),
            }
        }
        IdeasCommands::Show { id } => match service.db().get_idea(&id)? {
            Some(idea) => {
                print_idea(&idea);
                println!("    approved: {}, nsfw: {}", idea.is_approved, idea.is_nsfw);
            }
            None => println!("No idea with id {}", id),
        },
    }

    Ok(())
}

/// Review content and print the verdict
async fn run_moderate(config: AppConfig, content: String) -> Result<()> {
    let db = Database::in_memory()?;
    let service = IdeaService::from_config(&config, db)?;
    let verdict = service.moderate(&content).await;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

/// Run database commands
fn run_db_command(config: AppConfig, action: DbCommands) -> Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        DbCommands::Stats => {
            let stats = db.stats()?;
            println!("Database Statistics:");
            println!("  Ideas: {}", stats.total);
            println!("  Visible: {}", stats.visible);
            println!("  Categories:");
            for (category, count) in stats.categories {
                println!("    {} ({})", category, count);
            }
        }
        DbCommands::Export { output } => {
            let ideas = db.list_all()?;
            let json = serde_json::to_string_pretty(&ideas)?;
            std::fs::write(&output, json)?;
            println!("Exported {} ideas to {:?}", ideas.len(), output);
        }
        DbCommands::Hide { id, nsfw } => {
            if db.set_flags(&id, false, nsfw)? {
                println!("Hidden idea {}", id);
            } else {
                println!("No idea with id {}", id);
            }
        }
        DbCommands::Approve { id } => {
            if db.set_flags(&id, true, false)? {
                println!("Approved idea {}", id);
            } else {
                println!("No idea with id {}", id);
            }
        }
        DbCommands::Vacuum => {
            db.vacuum()?;
            println!("Database vacuumed successfully");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Listen: {}:{}", config.web.host, config.web.port);
            println!("  Database: {}", config.database.path);
            println!(
                "  Moderation: {}",
                if config.moderation.enabled { config.moderation.model.as_str() } else { "disabled" }
            );
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("Idea Board v1.0.0 Status");
    println!("========================");

    if config.moderation.enabled {
        let moderator = CompletionModerator::new(&config.moderation)?;
        match moderator.health_check().await {
            Ok(()) => println!("Moderation: reachable at {}", moderator.base_url()),
            Err(e) => println!("Moderation: Error - {} (submissions will be allowed)", e),
        }
        println!("  Model: {}", config.moderation.model);
    } else {
        println!("Moderation: disabled");
    }

    match Database::open(&config.database.path) {
        Ok(db) => {
            let stats = db.stats()?;
            println!("\nDatabase ({}):", config.database.path);
            println!("  Ideas: {}", stats.total);
            println!("  Visible: {}", stats.visible);
        }
        Err(e) => println!("\nDatabase: Error - {}", e),
    }

    Ok(())
}
