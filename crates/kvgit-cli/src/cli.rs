use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kvgit",
    about = "Versioned key-value buckets with first-push-wins sync",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Bucket directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Remote to clone from or check against
    #[arg(long, global = true)]
    pub remote: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the value stored at a key
    Get(GetArgs),
    /// Set a key and commit
    Set(SetArgs),
    /// Delete a key and commit
    Delete(DeleteArgs),
    /// List keys, optionally below a prefix
    List(ListArgs),
    /// Fetch from the remote without touching the local branch
    Fetch,
    /// Reset local state to the remote's
    Update(UpdateArgs),
    /// Push local commits to the remote
    Push,
    /// Show commit history
    Log(LogArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    /// Read the last committed value only
    #[arg(long)]
    pub committed: bool,
}

#[derive(Args)]
pub struct CommitOpts {
    #[arg(short, long)]
    pub message: Option<String>,
    /// Commit locally without pushing
    #[arg(long)]
    pub no_push: bool,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    pub value: String,
    #[command(flatten)]
    pub commit: CommitOpts,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub key: String,
    #[command(flatten)]
    pub commit: CommitOpts,
}

#[derive(Args)]
pub struct ListArgs {
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Discard staged changes
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}
