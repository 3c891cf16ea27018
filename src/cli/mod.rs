//! CLI interface and argument parsing
//!
//! Administrative commands for the entity store collection, built with clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Entity Store - typed entity store over Azure Cosmos DB
#[derive(Parser, Debug)]
#[command(name = "entity-store")]
#[command(version, about, long_about = None)]
#[command(author = "Entity Store Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "entity-store.toml", env = "ENTITY_STORE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ENTITY_STORE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Create database and collection if missing
    Provision(commands::provision::ProvisionArgs),

    /// Show database and collection status
    Status(commands::status::StatusArgs),

    /// Delete the collection and provision an empty one
    Clear(commands::clear::ClearArgs),
}
