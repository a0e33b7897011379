use clap::Parser;
use std::path::PathBuf;

mod commands;
mod records;

use commands::{Commands, Context};

#[derive(Parser)]
#[command(name = "shardcache")]
#[command(about = "Load records into a sharded cache and inspect the result", long_about = None)]
#[command(version)]
struct Cli {
    /// Number of shards; records go to `shard_key % shards`
    #[arg(long, default_value_t = 3)]
    shards: i32,

    /// Repository config file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    shardcache_utils::tracing::init().map_err(|e| eyre::eyre!(e))?;

    let cli = Cli::parse();
    let context = Context {
        shards: cli.shards,
        config_file: cli.config,
    };
    cli.command.execute(&context).await
}
