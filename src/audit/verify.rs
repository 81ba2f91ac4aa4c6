//! Checks that every stored post decodes: each referenced tag exists, every
//! tag-list blob is well formed and every enum column is in range.
//!
//! Each worker opens its own file-backed connection on a slice of the post id
//! space; the workers share one tag cache.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info};

use crate::database::models::Post;
use crate::database::schema::POST_COLUMNS;
use crate::database::storage::Storage;
use crate::database::tag_cache::TagCache;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub workers: usize,
    pub show_progress: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenPost {
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub checked: u64,
    pub broken: Vec<BrokenPost>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.broken.is_empty()
    }
}

enum Outcome {
    Ok,
    Broken(BrokenPost),
}

pub fn verify_posts(path: &Path, options: &VerifyOptions) -> StoreResult<VerifyReport> {
    let (range, total) = {
        let storage = Storage::open_existing(path, TagCache::shared())?;
        (storage.post_id_range()?, storage.count_posts()?)
    };
    let Some((min_id, max_id)) = range else {
        info!("No posts to verify");
        return Ok(VerifyReport::default());
    };

    let workers = options.workers.max(1);
    let shards = split_range(min_id, max_id, workers);
    info!("Verifying {} posts with {} workers", total, shards.len());

    let progress = if options.show_progress {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} posts [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let cache = TagCache::shared();
    let (tx, rx) = bounded::<Outcome>(1024);

    let handles: Vec<_> = shards
        .into_iter()
        .map(|(lo, hi)| {
            let tx = tx.clone();
            let cache = Arc::clone(&cache);
            let path = path.to_path_buf();
            thread::spawn(move || verify_shard(&path, cache, lo, hi, tx))
        })
        .collect();
    // The receive loop ends once every worker has dropped its sender.
    drop(tx);

    let mut report = VerifyReport::default();
    for outcome in rx {
        report.checked += 1;
        progress.inc(1);
        if let Outcome::Broken(broken) = outcome {
            report.broken.push(broken);
        }
    }
    progress.finish_and_clear();

    let mut first_err = None;
    for handle in handles {
        let result = handle
            .join()
            .unwrap_or_else(|_| Err(StoreError::Io(std::io::Error::other("verify worker panicked"))));
        if let Err(e) = result {
            error!("Verify worker failed: {}", e);
            first_err.get_or_insert(e);
        }
    }
    if let Some(e) = first_err {
        return Err(e);
    }

    report.broken.sort_by_key(|b| b.id);
    info!(
        "Checked {} posts, {} failed to decode",
        report.checked,
        report.broken.len()
    );
    Ok(report)
}

fn verify_shard(
    path: &Path,
    cache: Arc<TagCache>,
    lo: i64,
    hi: i64,
    tx: Sender<Outcome>,
) -> StoreResult<()> {
    let storage = Storage::open_existing(path, cache)?;
    let mut stmt = storage.connection().prepare(&format!(
        "SELECT {POST_COLUMNS} FROM post WHERE id BETWEEN ?1 AND ?2 ORDER BY id"
    ))?;
    let mut rows = stmt.query([lo, hi])?;
    while let Some(row) = rows.next()? {
        let outcome = match Post::from_row(row, storage.tag_cache(), &storage) {
            Ok(_) => Outcome::Ok,
            Err(e) if e.is_record_error() => Outcome::Broken(BrokenPost {
                id: row.get(0)?,
                reason: e.to_string(),
            }),
            Err(e) => return Err(e),
        };
        if tx.send(outcome).is_err() {
            break;
        }
    }
    Ok(())
}

/// Splits `[min, max]` into at most `parts` contiguous, non-empty ranges.
fn split_range(min: i64, max: i64, parts: usize) -> Vec<(i64, i64)> {
    let span = (max - min) as u64 + 1;
    let parts = (parts as u64).min(span);
    let step = span.div_ceil(parts);
    let mut shards = Vec::with_capacity(parts as usize);
    let mut lo = min;
    while lo <= max {
        let hi = lo.saturating_add(step as i64 - 1).min(max);
        shards.push((lo, hi));
        if hi == max {
            break;
        }
        lo = hi + 1;
    }
    shards
}
