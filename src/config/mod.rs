#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "cms-api")]
#[command(about = "Runs item, item set and media API requests against a seeded store")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "cms-api.toml")]
    pub config: String,

    /// JSON file with item sets and items to seed the store with
    #[arg(long)]
    pub fixtures: Option<String>,

    /// JSON file holding one request or an array of requests
    #[arg(short, long)]
    pub requests: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}
