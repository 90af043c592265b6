//! Init command implementation
//!
//! Writes a starter `edudesk.toml` and a `.env.example` holding freshly
//! generated token secrets.

use super::output::{Output, Status};
use crate::links::ShareLinkIssuer;
use crate::utils::toml_config::DEFAULT_CONFIG_TOML;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// edudesk.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Run the init command
pub fn run(path: &Path, force: bool, output: &Output) -> InitResult {
    output.heading("Initializing EduDesk");

    let config_path = path.join("edudesk.toml");
    if config_path.exists() && !force {
        output.status(
            Status::Warn,
            "edudesk.toml already exists, pass --force to overwrite it",
        );
        return InitResult::AlreadyExists;
    }

    let data_dir = path.join("data");
    if !data_dir.exists() {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.status(Status::Fail, &format!("could not create data/: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.status(Status::Done, "data/");
    }

    let files: [(PathBuf, String, &str); 2] = [
        (config_path, DEFAULT_CONFIG_TOML.to_string(), "edudesk.toml"),
        (path.join(".env.example"), generate_env_example(), ".env.example"),
    ];

    for (file, content, name) in files {
        if let Err(e) = write_file(&file, &content, force) {
            output.status(Status::Fail, &format!("could not write {}: {}", name, e));
            return InitResult::Error(e.to_string());
        }
        output.status(Status::Done, name);
    }

    output.status(Status::Note, "copy .env.example to .env, then start the server:");
    output.shell("cp .env.example .env");
    output.shell("edudesk-server");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

/// Two independent random secrets, one per token kind.
fn generate_env_example() -> String {
    format!(
        "# EduDesk environment variables\n\
         # Access and refresh tokens are signed with different secrets.\n\
         EDUDESK_ACCESS_SECRET={}\n\
         EDUDESK_REFRESH_SECRET={}\n\
         \n\
         # Optional: logging filter, overrides server.log_level\n\
         # RUST_LOG=info,edudesk=debug\n",
        ShareLinkIssuer::generate(48),
        ShareLinkIssuer::generate(48),
    )
}
