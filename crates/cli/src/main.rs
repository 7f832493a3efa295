use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod commands;
mod config;

use commands::execute_serve_command;

#[derive(Parser, Debug)]
#[command(name = "edit-server")]
#[command(about = "Edit HTTP POST bodies in a local editor and send the result back")]
#[command(version)]
pub struct Cli {
    /// Bind address [default: :8888]
    #[arg(short = 'b', long = "bind")]
    pub bind: Option<String>,
    /// The editor command, with args [default: "gvim -f"]
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,
    /// JSON configuration file; flags take precedence over its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Accept POST requests from any origin
    #[arg(long)]
    pub allow_any_origin: bool,
    /// Required prefix of the Origin header [default: chrome-extension:]
    #[arg(long)]
    pub origin_prefix: Option<String>,
    /// Directory for temporary files [default: system temp directory]
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
    /// Kill the editor after this many seconds
    #[arg(long)]
    pub editor_timeout_secs: Option<u64>,
    /// Fail the request when the editor exits unsuccessfully
    #[arg(long)]
    pub strict_exit: bool,
    /// Maximum number of edits running at once
    #[arg(long)]
    pub max_concurrent_edits: Option<usize>,
    /// Maximum request body size in bytes [default: 16777216]
    #[arg(long)]
    pub max_body_bytes: Option<usize>,
    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    execute_serve_command(cli).await
}
