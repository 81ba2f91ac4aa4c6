use rusqlite::types::Value;
use rusqlite::params_from_iter;

use crate::codec::tag_list::{self, TagId};
use crate::database::models::{rating_column, tag_type_column, Post, Tag};
use crate::database::schema::{POST_COLUMNS, TAG_COLUMNS};
use crate::database::storage::Storage;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub min_id: Option<i64>,
    pub max_id: Option<i64>,
    pub rating: Option<String>,
    pub min_score: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub kind: Option<String>,
    pub min_popularity: Option<i64>,
    pub limit: Option<u32>,
}

/// Which FTS column a tag search is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagListColumn {
    Combined,
    General,
    Artist,
    Character,
    Copyright,
    Meta,
}

impl TagListColumn {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "combined" | "tag_list" => Self::Combined,
            "general" | "tag_list_general" => Self::General,
            "artist" | "tag_list_artist" => Self::Artist,
            "character" | "tag_list_character" => Self::Character,
            "copyright" | "tag_list_copyright" => Self::Copyright,
            "meta" | "tag_list_meta" => Self::Meta,
            _ => return None,
        })
    }

    fn column(self) -> &'static str {
        match self {
            Self::Combined => "tag_list",
            Self::General => "tag_list_general",
            Self::Artist => "tag_list_artist",
            Self::Character => "tag_list_character",
            Self::Copyright => "tag_list_copyright",
            Self::Meta => "tag_list_meta",
        }
    }
}

/// Builds a `WHERE` clause and its parameters from optional conditions.
#[derive(Default)]
struct Conditions {
    clauses: Vec<&'static str>,
    params: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, clause: &'static str, value: impl Into<Value>) {
        self.clauses.push(clause);
        self.params.push(value.into());
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn limit_sql(limit: Option<u32>, offset: Option<u32>) -> String {
    match (limit, offset) {
        (None, None) => String::new(),
        (Some(l), None) => format!(" LIMIT {l}"),
        (l, Some(o)) => format!(" LIMIT {} OFFSET {o}", l.map_or(-1, i64::from)),
    }
}

impl Storage {
    pub fn post(&self, id: i64) -> StoreResult<Option<Post>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("SELECT {POST_COLUMNS} FROM post WHERE id = ?1"))?;
        let mut rows = stmt.query([id])?;
        rows.next()?
            .map(|row| Post::from_row(row, self.tag_cache(), self))
            .transpose()
    }

    /// Posts matching `filter`, ordered by id. The first post that fails to
    /// decode fails the whole call.
    pub fn posts(&self, filter: &PostFilter) -> StoreResult<Vec<Post>> {
        let mut conds = Conditions::default();
        if let Some(min) = filter.min_id {
            conds.push("id >= ?", min);
        }
        if let Some(max) = filter.max_id {
            conds.push("id <= ?", max);
        }
        if let Some(rating) = &filter.rating {
            conds.push("rating = ?", rating_column().encode(rating)?);
        }
        if let Some(score) = filter.min_score {
            conds.push("score >= ?", score);
        }
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM post{} ORDER BY id{}",
            conds.sql(),
            limit_sql(filter.limit, filter.offset)
        );

        let mut stmt = self.connection().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(conds.params.iter()))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(Post::from_row(row, self.tag_cache(), self)?);
        }
        Ok(posts)
    }

    /// Reads through the tag cache.
    pub fn tag(&self, id: i64) -> StoreResult<Option<Tag>> {
        match self.tag_cache().get(id, self) {
            Ok(tag) => Ok(Some(Tag::clone(&tag))),
            Err(StoreError::TagNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let mut stmt = self
            .connection()
            .prepare_cached(&format!("SELECT {TAG_COLUMNS} FROM tag WHERE name = ?1"))?;
        let mut rows = stmt.query([name])?;
        rows.next()?.map(Tag::from_row).transpose()
    }

    /// Tags matching `filter`, most popular first.
    pub fn tags(&self, filter: &TagFilter) -> StoreResult<Vec<Tag>> {
        let mut conds = Conditions::default();
        if let Some(kind) = &filter.kind {
            conds.push("type = ?", tag_type_column().encode(kind)?);
        }
        if let Some(min) = filter.min_popularity {
            conds.push("popularity >= ?", min);
        }
        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tag{} ORDER BY popularity DESC, id{}",
            conds.sql(),
            limit_sql(filter.limit, None)
        );

        let mut stmt = self.connection().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(conds.params.iter()))?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag::from_row(row)?);
        }
        Ok(tags)
    }

    /// Ids of posts whose `column` contains every one of `tags`, ascending.
    pub fn search_post_ids<T: TagId>(&self, column: TagListColumn, tags: &[T]) -> StoreResult<Vec<i64>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let query = tags
            .iter()
            .map(|t| {
                tag_list::id_token(t.tag_id())
                    .map(|token| format!("{} : \"{token}\"", column.column()))
            })
            .collect::<StoreResult<Vec<_>>>()?
            .join(" AND ");

        let mut stmt = self
            .connection()
            .prepare("SELECT rowid FROM postfts WHERE postfts MATCH ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map([query], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn count_posts(&self) -> StoreResult<i64> {
        Ok(self
            .connection()
            .query_row("SELECT COUNT(*) FROM post", [], |row| row.get(0))?)
    }

    pub fn count_tags(&self) -> StoreResult<i64> {
        Ok(self
            .connection()
            .query_row("SELECT COUNT(*) FROM tag", [], |row| row.get(0))?)
    }

    /// Smallest and largest post id, or `None` for an empty table.
    pub fn post_id_range(&self) -> StoreResult<Option<(i64, i64)>> {
        let range = self
            .connection()
            .query_row("SELECT MIN(id), MAX(id) FROM post", [], |row| {
                Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<i64>>(1)?))
            })?;
        Ok(match range {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        })
    }
}
