pub mod import;
pub mod models;
pub mod repo;
pub mod schema;
pub mod storage;
pub mod tag_cache;
