use std::collections::HashMap;

use crate::error::{StoreError, StoreResult};

/// A value headed for an enum column: either a category name or a raw index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumValue<'a> {
    Name(&'a str),
    Index(i64),
}

impl<'a> From<&'a str> for EnumValue<'a> {
    fn from(name: &'a str) -> Self {
        EnumValue::Name(name)
    }
}

impl<'a> From<&'a String> for EnumValue<'a> {
    fn from(name: &'a String) -> Self {
        EnumValue::Name(name.as_str())
    }
}

impl From<i64> for EnumValue<'_> {
    fn from(index: i64) -> Self {
        EnumValue::Index(index)
    }
}

/// Maps a closed, ordered list of category names to their positions.
///
/// The list lives in code, not in the database, so reordering it silently
/// changes the meaning of every stored row.
#[derive(Debug, Clone)]
pub struct EnumColumn {
    names: &'static [&'static str],
    index: HashMap<&'static str, i64>,
}

impl EnumColumn {
    pub fn new(names: &'static [&'static str]) -> Self {
        let index: HashMap<_, _> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, i as i64))
            .collect();
        debug_assert_eq!(index.len(), names.len(), "enum names must be distinct");
        Self { names, index }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Names are looked up; raw indices are stored as given, without a
    /// bounds check.
    pub fn encode<'a>(&self, value: impl Into<EnumValue<'a>>) -> StoreResult<i64> {
        match value.into() {
            EnumValue::Name(name) => {
                self.index
                    .get(name)
                    .copied()
                    .ok_or_else(|| StoreError::InvalidEnumValue {
                        value: name.to_string(),
                        allowed: self.names.to_vec(),
                    })
            }
            EnumValue::Index(i) => Ok(i),
        }
    }

    pub fn decode(&self, value: Option<i64>) -> StoreResult<Option<&'static str>> {
        value.map(|index| self.name(index)).transpose()
    }

    /// Name at `index`, for columns that cannot hold NULL.
    pub fn name(&self, index: i64) -> StoreResult<&'static str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.names.get(i))
            .copied()
            .ok_or(StoreError::EnumOutOfRange {
                index,
                len: self.names.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC: &[&str] = &["a", "b", "c"];

    #[test]
    fn test_encode_decode_by_position() {
        let col = EnumColumn::new(ABC);
        assert_eq!(col.encode("b").unwrap(), 1);
        assert_eq!(col.decode(Some(1)).unwrap(), Some("b"));
        assert_eq!(col.decode(Some(0)).unwrap(), Some("a"));
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let col = EnumColumn::new(ABC);
        let err = col.encode("d").unwrap_err();
        assert!(matches!(err, StoreError::InvalidEnumValue { ref value, .. } if value == "d"));
    }

    #[test]
    fn test_decode_out_of_range() {
        let col = EnumColumn::new(ABC);
        assert!(matches!(
            col.decode(Some(3)),
            Err(StoreError::EnumOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            col.decode(Some(-1)),
            Err(StoreError::EnumOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn test_null_decodes_to_none() {
        let col = EnumColumn::new(ABC);
        assert_eq!(col.decode(None).unwrap(), None);
    }

    // Raw indices skip validation on the way in, so a bad one is only caught
    // when the row is read back.
    #[test]
    fn test_raw_index_is_stored_unchecked() {
        let col = EnumColumn::new(ABC);
        assert_eq!(col.encode(2i64).unwrap(), 2);
        assert_eq!(col.encode(9i64).unwrap(), 9);
        assert!(col.decode(Some(9)).is_err());
    }
}
