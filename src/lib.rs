//! # booru-db
//!
//! Tag-indexed image metadata store for building text-image datasets from an
//! imageboard corpus.
//!
//! A single SQLite file holds a `post` table, a `tag` table and an FTS5
//! `postfts` table over the posts' tag lists. Each tag list is stored as one
//! text column of base-36 tag ids (`$1#$2#...`) and resolved to [`Tag`] rows
//! through a lazily filled [`TagCache`] when read. Categorical columns
//! (rating, tag type) are stored as indices into code-defined name lists.
//!
//! ```ignore
//! use booru_db::{PostFilter, Storage};
//!
//! let store = Storage::open_mirrored("danbooru2023.db")?;
//! for post in store.posts(&PostFilter { rating: Some("general".into()), limit: Some(10), ..Default::default() })? {
//!     println!("{} {:?}", post.id, post.tag_names());
//! }
//! store.save(Some("snapshot.db".as_ref()))?;
//! ```

pub mod audit;
pub mod codec;
pub mod database;
pub mod error;
pub mod utils;

pub use audit::verify::{verify_posts, BrokenPost, VerifyOptions, VerifyReport};
pub use codec::{EnumColumn, EnumValue, TagId};
pub use database::import::ImportWriter;
pub use database::models::{rating_column, tag_type_column, Post, PostFts, Tag, TagList};
pub use database::repo::{PostFilter, TagFilter, TagListColumn};
pub use database::storage::{Storage, StorageMode};
pub use database::tag_cache::{TagCache, TagSource};
pub use error::{StoreError, StoreResult};
