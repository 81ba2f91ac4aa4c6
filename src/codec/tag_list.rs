//! Tag-list columns.
//!
//! An ordered list of tag ids is stored as one text blob, each id rendered in
//! base 36 and wrapped as `$<id>#`:
//!
//! ```text
//! [1, 2, 470575]  ->  "$1#$2#$a33j#"
//! []              ->  ""
//! ```
//!
//! The `$`/`#` framing keeps token boundaries unambiguous and gives the FTS
//! tokenizer a separator, so every id becomes one searchable token.

use std::sync::Arc;

use crate::codec::base36;
use crate::database::models::Tag;
use crate::database::tag_cache::{TagCache, TagSource};
use crate::error::{StoreError, StoreResult};

const TOKEN_START: char = '$';
const TOKEN_END: char = '#';
const TOKEN_SEPARATOR: &str = "#$";

/// Anything that can stand in for a tag when writing a tag list.
pub trait TagId {
    fn tag_id(&self) -> i64;
}

impl TagId for i64 {
    fn tag_id(&self) -> i64 {
        *self
    }
}

impl TagId for Tag {
    fn tag_id(&self) -> i64 {
        self.id
    }
}

impl<T: TagId + ?Sized> TagId for &T {
    fn tag_id(&self) -> i64 {
        (**self).tag_id()
    }
}

impl<T: TagId + ?Sized> TagId for Arc<T> {
    fn tag_id(&self) -> i64 {
        (**self).tag_id()
    }
}

/// Renders one id as its searchable token, without framing.
pub fn id_token(id: i64) -> StoreResult<String> {
    u64::try_from(id)
        .map(base36::encode)
        .map_err(|_| StoreError::NegativeTagId(id))
}

pub fn encode<I>(tags: I) -> StoreResult<String>
where
    I: IntoIterator,
    I::Item: TagId,
{
    let mut blob = String::new();
    for tag in tags {
        blob.push(TOKEN_START);
        blob.push_str(&id_token(tag.tag_id())?);
        blob.push(TOKEN_END);
    }
    Ok(blob)
}

/// Splits a stored blob back into ids, in stored order.
pub fn parse_ids(blob: &str) -> StoreResult<Vec<i64>> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }
    let inner = blob
        .strip_prefix(TOKEN_START)
        .and_then(|rest| rest.strip_suffix(TOKEN_END))
        .ok_or_else(|| StoreError::malformed(blob, "expected `$...#` framing"))?;

    inner
        .split(TOKEN_SEPARATOR)
        .filter(|token| !token.is_empty())
        .map(|token| {
            base36::decode(token)
                .and_then(|id| i64::try_from(id).ok())
                .ok_or_else(|| StoreError::malformed(blob, format!("bad token {token:?}")))
        })
        .collect()
}

/// Decodes a nullable column into resolved tags. `None` stays `None`.
pub fn decode(
    value: Option<&str>,
    cache: &TagCache,
    source: &dyn TagSource,
) -> StoreResult<Option<Vec<Arc<Tag>>>> {
    let Some(blob) = value else {
        return Ok(None);
    };
    parse_ids(blob)?
        .into_iter()
        .map(|id| cache.get(id, source))
        .collect::<StoreResult<Vec<_>>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tag_cache::tests::MapSource;

    fn tag(id: i64, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_string(),
            kind: "general".to_string(),
            popularity: 0,
        }
    }

    #[test]
    fn test_encode_wire_format() {
        assert_eq!(encode([1i64, 2, 470_575]).unwrap(), "$1#$2#$a33j#");
        assert_eq!(encode([10i64]).unwrap(), "$a#");
        assert_eq!(encode(Vec::<i64>::new()).unwrap(), "");
    }

    #[test]
    fn test_encode_accepts_tags_and_ids() {
        let t = Arc::new(tag(36, "solo"));
        assert_eq!(encode([t.clone(), t]).unwrap(), "$10#$10#");
        assert_eq!(encode(&[tag(1, "1girl"), tag(2, "solo")]).unwrap(), "$1#$2#");
    }

    #[test]
    fn test_encode_rejects_negative_id() {
        assert!(matches!(encode([-4i64]), Err(StoreError::NegativeTagId(-4))));
    }

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        let ids: Vec<i64> = vec![500, 3, 3, 0, 9_999_999];
        assert_eq!(parse_ids(&encode(&ids).unwrap()).unwrap(), ids);
    }

    #[test]
    fn test_parse_empty_and_single() {
        assert!(parse_ids("").unwrap().is_empty());
        assert_eq!(parse_ids("$z#").unwrap(), vec![35]);
    }

    #[test]
    fn test_parse_skips_empty_tokens() {
        assert!(parse_ids("$#").unwrap().is_empty());
        assert_eq!(parse_ids("$1#$#$2#").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for blob in ["1#", "$1", "$1#2#", "$1#$-2#", "$ab cd#", "#", "$"] {
            assert!(
                matches!(parse_ids(blob), Err(StoreError::MalformedTagListBlob { .. })),
                "{blob:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_decode_resolves_in_order() {
        let source = MapSource::new([tag(1, "1girl"), tag(2, "solo")]);
        let cache = TagCache::new();
        let tags = decode(Some("$1#$2#"), &cache, &source).unwrap().unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["1girl", "solo"]);
    }

    #[test]
    fn test_decode_null_and_empty() {
        let source = MapSource::new([]);
        let cache = TagCache::new();
        assert!(decode(None, &cache, &source).unwrap().is_none());
        assert_eq!(decode(Some(""), &cache, &source).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_decode_missing_tag_is_an_error() {
        let source = MapSource::new([tag(1, "1girl")]);
        let cache = TagCache::new();
        assert!(matches!(
            decode(Some("$1#$7#"), &cache, &source),
            Err(StoreError::TagNotFound(7))
        ));
    }
}
