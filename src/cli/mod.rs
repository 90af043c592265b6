//! CLI module for EduDesk
//!
//! Provides command-line interface parsing and handling for the edudesk-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EduDesk - homework, quiz and attendance backend
///
/// Serves the EduDesk REST API with token authentication and shared-link
/// access to assignments.
#[derive(Parser, Debug)]
#[command(
    name = "edudesk-server",
    version,
    about = "EduDesk - homework, quiz and attendance backend",
    long_about = "Serves the EduDesk REST API: token authentication for teachers and students,\n\
                  and shared-link access to homeworks, quizzes and attendance sheets.\n\n\
                  Run without arguments to start the server, or use 'init' to write a starter config.",
    after_help = "EXAMPLES:\n    \
                  edudesk-server init                # Write edudesk.toml and .env.example\n    \
                  edudesk-server config --validate   # Check the configuration\n    \
                  edudesk-server                     # Start the server (requires edudesk.toml)\n    \
                  edudesk-server --config my.toml    # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "edudesk.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter edudesk.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file, including referenced secrets
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
