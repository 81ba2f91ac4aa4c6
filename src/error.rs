use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the codecs and the storage handle.
///
/// A record read that hits any of these fails as a whole; nothing here is
/// retried or swallowed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Encode-time: the name is not one of the column's categories.
    #[error("invalid enum value {value:?}, expected one of {allowed:?}")]
    InvalidEnumValue {
        value: String,
        allowed: Vec<&'static str>,
    },

    /// Decode-time: the stored index is outside the category list.
    #[error("enum index {index} out of range (0..{len})")]
    EnumOutOfRange { index: i64, len: usize },

    #[error("tag {0} not found")]
    TagNotFound(i64),

    #[error("malformed tag list blob {blob:?}: {reason}")]
    MalformedTagListBlob { blob: String, reason: String },

    /// Tag ids render as unsigned base 36.
    #[error("tag id {0} is negative")]
    NegativeTagId(i64),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} requires a mirrored (in-memory) store")]
    NotMirrored(&'static str),
}

impl StoreError {
    pub(crate) fn malformed(blob: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTagListBlob {
            blob: blob.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that concern a single record's contents rather than
    /// the store itself.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEnumValue { .. }
                | Self::EnumOutOfRange { .. }
                | Self::TagNotFound(_)
                | Self::MalformedTagListBlob { .. }
                | Self::NegativeTagId(_)
        )
    }
}
