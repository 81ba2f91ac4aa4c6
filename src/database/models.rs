use std::sync::{Arc, OnceLock};

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::codec::{tag_list, EnumColumn};
use crate::database::tag_cache::{TagCache, TagSource};
use crate::error::StoreResult;

pub const RATINGS: &[&str] = &["general", "sensitive", "questionable", "explicit"];
pub const TAG_TYPES: &[&str] = &["general", "artist", "character", "copyright", "meta"];

pub fn rating_column() -> &'static EnumColumn {
    static COLUMN: OnceLock<EnumColumn> = OnceLock::new();
    COLUMN.get_or_init(|| EnumColumn::new(RATINGS))
}

pub fn tag_type_column() -> &'static EnumColumn {
    static COLUMN: OnceLock<EnumColumn> = OnceLock::new();
    COLUMN.get_or_init(|| EnumColumn::new(TAG_TYPES))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub popularity: i64,
}

impl Tag {
    /// Reads a row selected with `schema::TAG_COLUMNS`.
    pub fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: tag_type_column().name(row.get(2)?)?.to_string(),
            popularity: row.get(3)?,
        })
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Tag: {}>", self.name)
    }
}

pub type TagList = Vec<Arc<Tag>>;

/// One image's metadata, with tag lists resolved to tag rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: i64,
    pub created_at: String,
    pub uploader_id: i64,
    pub source: String,
    pub md5: Option<String>,
    pub parent_id: Option<i64>,
    pub has_children: bool,
    pub is_deleted: bool,
    pub is_banned: bool,
    pub pixiv_id: Option<i64>,
    pub has_active_children: bool,
    pub bit_flags: i64,
    pub has_large: bool,
    pub has_visible_children: bool,

    pub image_width: i64,
    pub image_height: i64,
    pub file_size: i64,
    pub file_ext: String,

    pub rating: String,
    pub score: i64,
    pub up_score: i64,
    pub down_score: i64,
    pub fav_count: i64,

    pub file_url: String,
    pub large_file_url: String,
    pub preview_file_url: String,

    pub tag_list: TagList,
    pub tag_list_general: TagList,
    pub tag_list_artist: TagList,
    pub tag_list_character: TagList,
    pub tag_list_copyright: TagList,
    pub tag_list_meta: TagList,

    pub tag_count: i64,
    pub tag_count_general: i64,
    pub tag_count_artist: i64,
    pub tag_count_character: i64,
    pub tag_count_copyright: i64,
    pub tag_count_meta: i64,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: 0,
            created_at: String::new(),
            uploader_id: 0,
            source: String::new(),
            md5: None,
            parent_id: None,
            has_children: false,
            is_deleted: false,
            is_banned: false,
            pixiv_id: None,
            has_active_children: false,
            bit_flags: 0,
            has_large: false,
            has_visible_children: false,
            image_width: 0,
            image_height: 0,
            file_size: 0,
            file_ext: String::new(),
            rating: RATINGS[0].to_string(),
            score: 0,
            up_score: 0,
            down_score: 0,
            fav_count: 0,
            file_url: String::new(),
            large_file_url: String::new(),
            preview_file_url: String::new(),
            tag_list: Vec::new(),
            tag_list_general: Vec::new(),
            tag_list_artist: Vec::new(),
            tag_list_character: Vec::new(),
            tag_list_copyright: Vec::new(),
            tag_list_meta: Vec::new(),
            tag_count: 0,
            tag_count_general: 0,
            tag_count_artist: 0,
            tag_count_character: 0,
            tag_count_copyright: 0,
            tag_count_meta: 0,
        }
    }
}

impl Post {
    /// Reads a row selected with `schema::POST_COLUMNS`, resolving every
    /// tag-list column through `cache`. Any column failing to decode fails
    /// the whole post.
    pub fn from_row(row: &Row<'_>, cache: &TagCache, source: &dyn TagSource) -> StoreResult<Self> {
        let tags = |idx: usize| -> StoreResult<TagList> {
            let blob: Option<String> = row.get(idx)?;
            Ok(tag_list::decode(blob.as_deref(), cache, source)?.unwrap_or_default())
        };

        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            uploader_id: row.get(2)?,
            source: row.get(3)?,
            md5: row.get(4)?,
            parent_id: row.get(5)?,
            has_children: row.get(6)?,
            is_deleted: row.get(7)?,
            is_banned: row.get(8)?,
            pixiv_id: row.get(9)?,
            has_active_children: row.get(10)?,
            bit_flags: row.get(11)?,
            has_large: row.get(12)?,
            has_visible_children: row.get(13)?,
            image_width: row.get(14)?,
            image_height: row.get(15)?,
            file_size: row.get(16)?,
            file_ext: row.get(17)?,
            rating: rating_column().name(row.get(18)?)?.to_string(),
            score: row.get(19)?,
            up_score: row.get(20)?,
            down_score: row.get(21)?,
            fav_count: row.get(22)?,
            file_url: row.get(23)?,
            large_file_url: row.get(24)?,
            preview_file_url: row.get(25)?,
            tag_list: tags(26)?,
            tag_list_general: tags(27)?,
            tag_list_artist: tags(28)?,
            tag_list_character: tags(29)?,
            tag_list_copyright: tags(30)?,
            tag_list_meta: tags(31)?,
            tag_count: row.get(32)?,
            tag_count_general: row.get(33)?,
            tag_count_artist: row.get(34)?,
            tag_count_character: row.get(35)?,
            tag_count_copyright: row.get(36)?,
            tag_count_meta: row.get(37)?,
        })
    }

    /// The six tag lists in `schema::TAG_LIST_COLUMNS` order.
    pub fn tag_lists(&self) -> [&TagList; 6] {
        [
            &self.tag_list,
            &self.tag_list_general,
            &self.tag_list_artist,
            &self.tag_list_character,
            &self.tag_list_copyright,
            &self.tag_list_meta,
        ]
    }

    /// Sets every `tag_count*` field from its list's length.
    pub fn recount_tags(&mut self) {
        self.tag_count = self.tag_list.len() as i64;
        self.tag_count_general = self.tag_list_general.len() as i64;
        self.tag_count_artist = self.tag_list_artist.len() as i64;
        self.tag_count_character = self.tag_list_character.len() as i64;
        self.tag_count_copyright = self.tag_list_copyright.len() as i64;
        self.tag_count_meta = self.tag_list_meta.len() as i64;
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tag_list.iter().map(|t| t.name.as_str()).collect()
    }
}

/// The search projection of a post: its six tag lists, encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFts {
    /// Stored as the FTS rowid.
    pub post_id: i64,
    pub columns: [String; 6],
}

impl PostFts {
    pub fn from_post(post: &Post) -> StoreResult<Self> {
        let lists = post.tag_lists();
        let mut columns: [String; 6] = Default::default();
        for (column, list) in columns.iter_mut().zip(lists) {
            *column = tag_list::encode(list)?;
        }
        Ok(Self {
            post_id: post.id,
            columns,
        })
    }
}
