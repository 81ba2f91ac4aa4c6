pub mod base36;
pub mod enum_column;
pub mod tag_list;

pub use enum_column::{EnumColumn, EnumValue};
pub use tag_list::TagId;
