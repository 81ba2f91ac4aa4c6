//! The storage handle.
//!
//! A handle is either backed directly by the database file, or mirrored: the
//! whole file is copied into an in-memory database at open time and every
//! read and write goes to that copy. A mirrored handle never writes back on
//! its own. Changes not passed through [`Storage::save`] are lost when the
//! handle is dropped.
//!
//! Copies use SQLite's online backup API and block until complete. A copy
//! that fails part way leaves the destination unusable; reload it from a
//! known-good file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::database::models::Tag;
use crate::database::schema::{SCHEMA, TAG_COLUMNS};
use crate::database::tag_cache::{TagCache, TagSource};
use crate::error::{StoreError, StoreResult};

const BACKUP_PAGES_PER_STEP: i32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    File,
    Mirrored,
}

pub struct Storage {
    conn: Connection,
    source: PathBuf,
    mode: StorageMode,
    tags: Arc<TagCache>,
}

impl Storage {
    /// Opens (creating if needed) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_cache(path, TagCache::shared())
    }

    /// Opens a file-backed store that shares `tags` with other handles on the
    /// same file, e.g. one handle per worker thread.
    pub fn open_with_cache(path: impl AsRef<Path>, tags: Arc<TagCache>) -> StoreResult<Self> {
        let source = path.as_ref().to_path_buf();
        info!("Opening store at {:?}", source);
        let conn = Connection::open(&source)?;
        Self::file_backed(conn, source, tags)
    }

    /// Like [`Storage::open_with_cache`], but fails instead of creating a
    /// missing file.
    pub fn open_existing(path: impl AsRef<Path>, tags: Arc<TagCache>) -> StoreResult<Self> {
        let source = path.as_ref().to_path_buf();
        info!("Opening existing store at {:?}", source);
        let conn = Connection::open_with_flags(
            &source,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::file_backed(conn, source, tags)
    }

    fn file_backed(conn: Connection, source: PathBuf, tags: Arc<TagCache>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            source,
            mode: StorageMode::File,
            tags,
        })
    }

    /// Copies the store at `path` into memory and serves everything from the
    /// copy. The file must already exist.
    pub fn open_mirrored(path: impl AsRef<Path>) -> StoreResult<Self> {
        let source = path.as_ref().to_path_buf();
        info!("Loading store at {:?} into memory", source);
        let mut conn = Connection::open_in_memory()?;
        {
            let file = open_source(&source)?;
            copy_database(&file, &mut conn)?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            source,
            mode: StorageMode::Mirrored,
            tags: TagCache::shared(),
        })
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn tag_cache(&self) -> &Arc<TagCache> {
        &self.tags
    }

    /// Writes the in-memory contents to `target`, or back to the file the
    /// handle was opened from. Whatever `target` held before is replaced.
    pub fn save(&self, target: Option<&Path>) -> StoreResult<()> {
        if self.mode != StorageMode::Mirrored {
            return Err(StoreError::NotMirrored("save"));
        }
        let target = target.unwrap_or(&self.source);
        info!("Saving in-memory store to {:?}", target);
        let mut dest = Connection::open(target)?;
        copy_database(&self.conn, &mut dest)?;
        dest.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    /// Replaces the in-memory contents with the store at `source`, or with
    /// the file the handle was opened from. A source that cannot be opened
    /// leaves the in-memory contents untouched.
    pub fn reload(&mut self, source: Option<&Path>) -> StoreResult<()> {
        if self.mode != StorageMode::Mirrored {
            return Err(StoreError::NotMirrored("reload"));
        }
        let source = source.unwrap_or(&self.source);
        info!("Reloading in-memory store from {:?}", source);
        let file = open_source(source)?;
        copy_database(&file, &mut self.conn)?;
        file.close().map_err(|(_, e)| e)?;
        self.conn.execute_batch(SCHEMA)?;
        // Cached rows may be gone or changed in the reloaded data.
        self.tags.clear();
        Ok(())
    }

    /// Names of the indexes defined on `table`.
    pub fn indexes(&self, table: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_index_list(?1) ORDER BY name")?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

impl TagSource for Storage {
    fn fetch_tag(&self, id: i64) -> StoreResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {TAG_COLUMNS} FROM tag WHERE id = ?1"))?;
        let mut rows = stmt.query([id])?;
        rows.next()?.map(Tag::from_row).transpose()
    }
}

/// Opens the file side of a mirror load read-only, so a missing file is an
/// error rather than a new empty store.
fn open_source(path: &Path) -> StoreResult<Connection> {
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

fn copy_database(from: &Connection, to: &mut Connection) -> StoreResult<()> {
    let started = Instant::now();
    let backup = Backup::new(from, to)?;
    backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)?;
    debug!("Database copy finished in {:?}", started.elapsed());
    Ok(())
}
