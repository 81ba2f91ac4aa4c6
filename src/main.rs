use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use booru_db::utils::config::{get_store_config, StoreConfig};
use booru_db::{verify_posts, PostFilter, Storage, TagListColumn, VerifyOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Store file. Falls back to .env, then a search for the corpus file.
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Load the store into memory before running the command.
    #[arg(short, long)]
    mirrored: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the post table's indexes and print the first post.
    Inspect,
    /// Print one post as JSON.
    Post { id: i64 },
    /// Print one tag as JSON.
    Tag { name: String },
    /// Print ids of posts carrying all of the given tags.
    Search {
        /// combined, general, artist, character, copyright or meta
        #[arg(short, long, default_value = "combined")]
        column: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Decode every post and report the ones that fail.
    Verify {
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
    },
    /// Copy the store, through memory, to another file.
    Snapshot { target: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let config = match args.db_path {
        Some(db_path) => StoreConfig {
            db_path,
            mirrored: args.mirrored,
        },
        None => {
            let mut config = get_store_config()?;
            config.mirrored |= args.mirrored;
            config
        }
    };
    info!("Store: {:?} (mirrored: {})", config.db_path, config.mirrored);

    match args.command {
        Command::Verify { workers } => {
            if config.mirrored {
                warn!("Verification reads the file directly; ignoring --mirrored");
            }
            let options = VerifyOptions {
                workers,
                show_progress: true,
            };
            let report = verify_posts(&config.db_path, &options)?;
            for broken in &report.broken {
                println!("{}\t{}", broken.id, broken.reason);
            }
            if !report.is_clean() {
                bail!("{} of {} posts failed to decode", report.broken.len(), report.checked);
            }
            Ok(())
        }
        Command::Snapshot { target } => {
            let storage = Storage::open_mirrored(&config.db_path)?;
            storage.save(Some(&target))?;
            info!("Snapshot written to {:?}", target);
            Ok(())
        }
        Command::Inspect => {
            let storage = open_store(&config)?;
            for index in storage.indexes("post")? {
                println!("{}", index);
            }
            let first = storage.posts(&PostFilter {
                limit: Some(1),
                ..Default::default()
            })?;
            match first.first() {
                Some(post) => println!("{}", serde_json::to_string_pretty(post)?),
                None => info!("Store has no posts"),
            }
            Ok(())
        }
        Command::Post { id } => {
            let storage = open_store(&config)?;
            let post = storage.post(id)?.ok_or_else(|| anyhow!("post {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&post)?);
            Ok(())
        }
        Command::Tag { name } => {
            let storage = open_store(&config)?;
            let tag = storage
                .tag_by_name(&name)?
                .ok_or_else(|| anyhow!("tag {:?} not found", name))?;
            println!("{}", serde_json::to_string_pretty(&tag)?);
            Ok(())
        }
        Command::Search { column, tags } => {
            let column = TagListColumn::from_name(&column)
                .ok_or_else(|| anyhow!("unknown tag list column {:?}", column))?;
            let storage = open_store(&config)?;
            let tags = tags
                .iter()
                .map(|name| {
                    storage
                        .tag_by_name(name)?
                        .ok_or_else(|| anyhow!("tag {:?} not found", name))
                })
                .collect::<Result<Vec<_>>>()?;
            for id in storage.search_post_ids(column, &tags)? {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

fn open_store(config: &StoreConfig) -> Result<Storage> {
    let storage = if config.mirrored {
        Storage::open_mirrored(&config.db_path)
    } else {
        Storage::open(&config.db_path)
    };
    storage.context("Failed to open store")
}
