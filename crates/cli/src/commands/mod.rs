use crate::records::{file_loader, Records};
use clap::Subcommand;
use eyre::{eyre, WrapErr};
use serde::Serialize;
use shardcache_core::{ReadMode, ShardIndex};
use shardcache_engine::{
    ChangedFields, LoadedConfig, ModuloRule, Repository, RepositoryConfigLoader,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Load records and print which shard holds each key
    Layout {
        /// JSON file holding an array of records
        records: PathBuf,
    },

    /// Load records and print one of them
    Get {
        /// JSON file holding an array of records
        records: PathBuf,

        /// Key of the record
        key: String,

        /// Shard key used to locate the record
        #[arg(long, allow_hyphen_values = true)]
        shard_key: i32,

        /// Return the stored instance instead of a copy
        #[arg(long)]
        shared: bool,
    },

    /// Load records, change one field and report where the record ended up
    Set {
        /// JSON file holding an array of records
        records: PathBuf,

        /// Key of the record
        key: String,

        /// Shard key used to locate the record
        #[arg(long, allow_hyphen_values = true)]
        shard_key: i32,

        /// Field to write, as NAME=JSON
        #[arg(long, value_parser = parse_assignment)]
        field: Option<(String, serde_json::Value)>,

        /// New shard key for the record
        #[arg(long, allow_hyphen_values = true)]
        move_to: Option<i32>,
    },

    /// Print the effective repository configuration and its source
    Config,
}

/// Settings shared by every command
pub struct Context {
    pub shards: ShardIndex,
    pub config_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct ShardLayout {
    index: ShardIndex,
    tag: String,
    keys: Vec<String>,
}

#[derive(Serialize)]
struct SetReport<'a> {
    key: &'a str,
    affected: bool,
    shard: Option<ShardIndex>,
    mirrored: bool,
}

impl Commands {
    pub async fn execute(self, context: &Context) -> eyre::Result<()> {
        match self {
            Commands::Layout { records } => {
                let repository = open_repository(context, &records)?;
                print_json(&layout(&repository))
            }
            Commands::Get {
                records,
                key,
                shard_key,
                shared,
            } => {
                let repository = open_repository(context, &records)?;
                let mode = if shared {
                    ReadMode::Shared
                } else {
                    repository.config().default_read_mode
                };
                let record = repository
                    .get(&key, &shard_key, mode)
                    .wrap_err_with(|| format!("reading {key}"))?;
                let result = print_json(&*record.read());
                result
            }
            Commands::Set {
                records,
                key,
                shard_key,
                field,
                move_to,
            } => {
                if field.is_none() && move_to.is_none() {
                    return Err(eyre!("nothing to change: pass --field and/or --move-to"));
                }
                let repository = open_repository(context, &records)?;

                let mut changed = ChangedFields::new();
                let affected = repository.try_update(&key, &shard_key, |record| {
                    if let Some((name, value)) = field {
                        record.set_field(&name, value.clone());
                        changed.insert(name, value);
                    }
                    if let Some(target) = move_to {
                        record.set_shard_key(target);
                        changed.insert("shard_key".to_string(), target.into());
                    }
                })?;

                let mirrored = if affected {
                    repository.write_back().sync_update(&changed).await?
                } else {
                    false
                };
                let shard = locate(&repository, &key);
                info!(key = %key, affected, ?shard, "record updated");

                print_json(&SetReport {
                    key: &key,
                    affected,
                    shard,
                    mirrored,
                })
            }
            Commands::Config => print_json(&load_config(context)?),
        }
    }
}

fn load_config(context: &Context) -> eyre::Result<LoadedConfig> {
    let loaded = match &context.config_file {
        Some(path) => RepositoryConfigLoader::load_with_file(path),
        None => RepositoryConfigLoader::load(),
    };
    loaded.wrap_err("loading repository configuration")
}

fn open_repository(context: &Context, records: &Path) -> eyre::Result<Repository<Records>> {
    let loaded = load_config(context)?;
    let rule = ModuloRule::new(context.shards)?;
    let repository = Repository::builder(Records, rule)
        .with_loader(file_loader(records.to_path_buf()))
        .with_config(loaded.config)
        .build();

    let span = shardcache_utils::tracing::repository_span(&repository.config().name);
    let _entered = span.enter();
    let count = repository
        .init()
        .wrap_err_with(|| format!("loading records from {}", records.display()))?;
    info!(records = count, shards = repository.shard_count(), "records loaded");
    Ok(repository)
}

fn layout(repository: &Repository<Records>) -> Vec<ShardLayout> {
    repository
        .shard_indices()
        .into_iter()
        .filter_map(|index| repository.shard(index))
        .map(|shard| {
            let _entered = shardcache_utils::tracing::shard_span("layout", shard.index()).entered();
            let mut keys = shard.keys();
            keys.sort();
            ShardLayout {
                index: shard.index(),
                tag: shard.tag().to_string(),
                keys,
            }
        })
        .collect()
}

/// Index of the shard currently holding `key`
fn locate(repository: &Repository<Records>, key: &str) -> Option<ShardIndex> {
    let key = key.to_string();
    repository
        .shard_indices()
        .into_iter()
        .find(|index| {
            repository
                .shard(*index)
                .is_some_and(|shard| shard.contains_key(&key))
        })
}

fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=JSON, got `{raw}`"))?;
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    // Bare words are taken as strings.
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
