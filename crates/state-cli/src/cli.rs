use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stated",
    about = "Save and serve JSON state documents",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Settings shared by every subcommand. Flags override the config file and
/// the environment.
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true, env = "STATED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory of the local object store
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(long, global = true)]
    pub state_bucket: Option<String>,

    #[arg(long, global = true)]
    pub layer_bucket: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Save a JSON document and print its identifier
    Save(SaveArgs),
    /// Print a saved document
    Load(LoadArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Base URL used in returned references
    #[arg(long)]
    pub public_url: Option<String>,
}

#[derive(Args)]
pub struct SaveArgs {
    /// File to save, or `-` for stdin
    pub file: PathBuf,
    /// Attribution recorded with the document
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct LoadArgs {
    pub id: String,
    /// Also print who saved the document
    #[arg(long)]
    pub show_user: bool,
}
