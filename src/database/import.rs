use rusqlite::params;
use tracing::debug;

use crate::database::models::{rating_column, tag_type_column, Post, PostFts, Tag};
use crate::database::schema::{POST_COLUMNS, TAG_COLUMNS};
use crate::database::storage::Storage;
use crate::error::StoreResult;

const DEFAULT_BUFFER_LIMIT: usize = 1000;

/// A post with its enum and tag-list columns already encoded.
struct EncodedPost {
    post: Post,
    rating: i64,
    fts: PostFts,
}

/// Buffers tag and post rows and writes them in one transaction per batch.
///
/// Rows are encoded when added, so a row with a bad rating, tag type or tag
/// id is rejected by `add_*` and never enters the buffer. A batch that fails
/// to write is dropped; the error is returned from the call that flushed it.
///
/// Rows with an existing id are replaced. Tags are written before posts
/// within a batch. Referenced tags are not checked here; reading a post
/// whose tags are missing fails with `TagNotFound`.
pub struct ImportWriter<'a> {
    storage: &'a mut Storage,
    tags: Vec<(Tag, i64)>,
    posts: Vec<EncodedPost>,
    buffer_limit: usize,
}

impl<'a> ImportWriter<'a> {
    pub fn new(storage: &'a mut Storage) -> Self {
        Self::with_buffer_limit(storage, DEFAULT_BUFFER_LIMIT)
    }

    pub fn with_buffer_limit(storage: &'a mut Storage, buffer_limit: usize) -> Self {
        Self {
            storage,
            tags: Vec::new(),
            posts: Vec::new(),
            buffer_limit: buffer_limit.max(1),
        }
    }

    pub fn add_tag(&mut self, tag: Tag) -> StoreResult<()> {
        let kind = tag_type_column().encode(&tag.kind)?;
        self.tags.push((tag, kind));
        self.flush_if_full()
    }

    pub fn add_post(&mut self, post: Post) -> StoreResult<()> {
        let rating = rating_column().encode(&post.rating)?;
        let fts = PostFts::from_post(&post)?;
        self.posts.push(EncodedPost { post, rating, fts });
        self.flush_if_full()
    }

    fn flush_if_full(&mut self) -> StoreResult<()> {
        if self.tags.len() + self.posts.len() >= self.buffer_limit {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> StoreResult<()> {
        if self.tags.is_empty() && self.posts.is_empty() {
            return Ok(());
        }
        let tags = std::mem::take(&mut self.tags);
        let posts = std::mem::take(&mut self.posts);

        let tx = self.storage.connection_mut().transaction()?;
        {
            let mut stmt_tag = tx.prepare(&format!(
                "INSERT OR REPLACE INTO tag ({TAG_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"
            ))?;
            let mut stmt_post = tx.prepare(&format!(
                "INSERT OR REPLACE INTO post ({POST_COLUMNS}) VALUES ({})",
                placeholders(38)
            ))?;
            let mut stmt_fts_delete = tx.prepare("DELETE FROM postfts WHERE rowid = ?1")?;
            let mut stmt_fts = tx.prepare(
                "INSERT INTO postfts (rowid, tag_list, tag_list_general, tag_list_artist,
                    tag_list_character, tag_list_copyright, tag_list_meta)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (tag, kind) in &tags {
                stmt_tag.execute(params![tag.id, tag.name, kind, tag.popularity])?;
            }

            for EncodedPost { post, rating, fts } in &posts {
                let [all, general, artist, character, copyright, meta] = &fts.columns;

                stmt_post.execute(params![
                    post.id,
                    post.created_at,
                    post.uploader_id,
                    post.source,
                    post.md5,
                    post.parent_id,
                    post.has_children,
                    post.is_deleted,
                    post.is_banned,
                    post.pixiv_id,
                    post.has_active_children,
                    post.bit_flags,
                    post.has_large,
                    post.has_visible_children,
                    post.image_width,
                    post.image_height,
                    post.file_size,
                    post.file_ext,
                    rating,
                    post.score,
                    post.up_score,
                    post.down_score,
                    post.fav_count,
                    post.file_url,
                    post.large_file_url,
                    post.preview_file_url,
                    all,
                    general,
                    artist,
                    character,
                    copyright,
                    meta,
                    post.tag_count,
                    post.tag_count_general,
                    post.tag_count_artist,
                    post.tag_count_character,
                    post.tag_count_copyright,
                    post.tag_count_meta,
                ])?;

                // FTS5 has no primary key to conflict on, so replace by hand.
                stmt_fts_delete.execute([fts.post_id])?;
                stmt_fts.execute(params![fts.post_id, all, general, artist, character, copyright, meta])?;
            }
        }
        tx.commit()?;

        debug!(tags = tags.len(), posts = posts.len(), "Flushed import batch");
        if !tags.is_empty() {
            self.storage.tag_cache().clear();
        }
        Ok(())
    }

    /// Flushes whatever is still buffered.
    pub fn finish(mut self) -> StoreResult<()> {
        self.flush()
    }
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repo::TagListColumn;
    use crate::error::StoreError;
    use anyhow::Result;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn tag(id: i64, name: &str, kind: &str) -> Tag {
        Tag {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
            popularity: 100 - id,
        }
    }

    #[test]
    fn test_buffer_limit_triggers_flush() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::open(dir.path().join("import.db"))?;
        {
            let mut writer = ImportWriter::with_buffer_limit(&mut storage, 2);
            writer.add_tag(tag(1, "1girl", "general"))?;
            writer.add_tag(tag(2, "solo", "general"))?;
            writer.add_tag(tag(3, "smile", "general"))?;
            // dropped without finish: the third tag never reaches the store
        }
        assert_eq!(storage.count_tags()?, 2);
        Ok(())
    }

    #[test]
    fn test_post_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::open(dir.path().join("import.db"))?;
        let girl = Arc::new(tag(1, "1girl", "general"));
        let miku = Arc::new(tag(40, "hatsune_miku", "character"));

        let mut post = Post {
            id: 6_000_001,
            created_at: "2023-01-01T00:00:00".to_string(),
            md5: Some("d41d8cd98f00b204e9800998ecf8427e".to_string()),
            rating: "sensitive".to_string(),
            file_ext: "png".to_string(),
            tag_list: vec![girl.clone(), miku.clone()],
            tag_list_general: vec![girl.clone()],
            tag_list_character: vec![miku.clone()],
            ..Post::default()
        };
        post.recount_tags();

        let mut writer = ImportWriter::new(&mut storage);
        writer.add_tag(Tag::clone(&girl))?;
        writer.add_tag(Tag::clone(&miku))?;
        writer.add_post(post.clone())?;
        writer.finish()?;

        let raw: String = storage.connection().query_row(
            "SELECT tag_list FROM post WHERE id = ?1",
            [post.id],
            |row| row.get(0),
        )?;
        assert_eq!(raw, "$1#$14#");

        let read = storage.post(post.id)?.expect("post was written");
        assert_eq!(read, post);
        Ok(())
    }

    #[test]
    fn test_invalid_rating_is_rejected_on_add() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::open(dir.path().join("import.db"))?;
        let mut writer = ImportWriter::new(&mut storage);
        let err = writer
            .add_post(Post {
                id: 1,
                rating: "safe".to_string(),
                ..Post::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEnumValue { .. }));
        assert!(matches!(
            writer.add_tag(tag(1, "1girl", "species")),
            Err(StoreError::InvalidEnumValue { .. })
        ));
        writer.finish()?;
        assert_eq!(storage.count_posts()?, 0);
        assert_eq!(storage.count_tags()?, 0);
        Ok(())
    }

    #[test]
    fn test_bad_row_does_not_block_later_rows() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::open(dir.path().join("import.db"))?;
        let mut writer = ImportWriter::with_buffer_limit(&mut storage, 2);

        assert!(writer
            .add_post(Post {
                id: 1,
                rating: "safe".to_string(),
                ..Post::default()
            })
            .is_err());
        writer.add_tag(tag(1, "1girl", "general"))?;
        writer.add_tag(tag(2, "solo", "general"))?;
        writer.add_tag(tag(3, "smile", "general"))?;
        writer.finish()?;

        assert_eq!(storage.count_tags()?, 3);
        assert_eq!(storage.count_posts()?, 0);
        Ok(())
    }

    #[test]
    fn test_failed_batch_is_dropped() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::open(dir.path().join("import.db"))?;
        storage.connection().execute_batch(
            "CREATE TRIGGER reject_ghost BEFORE INSERT ON tag WHEN NEW.name = 'ghost'
             BEGIN SELECT RAISE(ABORT, 'ghost tags are not allowed'); END;",
        )?;
        let mut writer = ImportWriter::new(&mut storage);

        writer.add_tag(tag(1, "1girl", "general"))?;
        writer.add_tag(tag(2, "ghost", "meta"))?;
        assert!(matches!(writer.flush(), Err(StoreError::Storage(_))));

        writer.add_tag(tag(3, "solo", "general"))?;
        writer.finish()?;
        assert_eq!(storage.count_tags()?, 1);
        assert_eq!(storage.tag_by_name("solo")?.map(|t| t.id), Some(3));
        Ok(())
    }

    #[test]
    fn test_rewriting_post_replaces_fts_row() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::open(dir.path().join("import.db"))?;
        let a = Arc::new(tag(1, "a", "general"));
        let b = Arc::new(tag(2, "b", "general"));

        let mut writer = ImportWriter::new(&mut storage);
        writer.add_tag(Tag::clone(&a))?;
        writer.add_tag(Tag::clone(&b))?;
        writer.add_post(Post { id: 9, tag_list: vec![a.clone()], ..Post::default() })?;
        writer.flush()?;
        writer.add_post(Post { id: 9, tag_list: vec![b.clone()], ..Post::default() })?;
        writer.finish()?;

        let fts_rows: i64 = storage
            .connection()
            .query_row("SELECT COUNT(*) FROM postfts", [], |row| row.get(0))?;
        assert_eq!(fts_rows, 1);
        assert!(storage.search_post_ids(TagListColumn::Combined, &[1i64])?.is_empty());
        assert_eq!(storage.search_post_ids(TagListColumn::Combined, &[2i64])?, [9]);
        Ok(())
    }
}
