// ABOUTME: Shared capability interface implemented by each platform client
// ABOUTME: Defines cursors, listing pages, and the enriched output record

use crate::Result;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Opaque continuation token. The empty cursor means "from the beginning".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn start() -> Self {
        Cursor(String::new())
    }

    pub fn new(token: impl Into<String>) -> Self {
        Cursor(token.into().trim().to_string())
    }

    pub fn is_start(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a listing call.
#[derive(Debug, Clone)]
pub struct MarkPage<M> {
    pub marks: Vec<M>,
    pub has_more: bool,
    pub next: Cursor,
}

/// What the export loop needs to know about a listed mark.
pub trait MarkRef {
    fn item_id(&self) -> Cow<'_, str>;

    /// Token scoped to this item for the detail call; empty when the platform has none.
    fn access_token(&self) -> &str;

    fn display_title(&self) -> &str;
}

pub trait Platform {
    type Mark: MarkRef + Serialize;
    type Detail: Serialize;

    fn name(&self) -> &'static str;

    /// Label used in per-item progress lines ("Note", "Item").
    fn item_noun(&self) -> &'static str {
        "Item"
    }

    fn list_marks(&self, cursor: &Cursor, page_size: u32) -> Result<MarkPage<Self::Mark>>;

    fn get_detail(&self, item_id: &str, access_token: &str) -> Result<Self::Detail>;

    /// Cursor resuming right after the first `taken` marks of the page listed
    /// from `start`. `None` when the platform's cursors cannot express it.
    fn cursor_after(&self, _start: &Cursor, _taken: usize) -> Option<Cursor> {
        None
    }
}

/// A mark merged with its detail under the `detail` key, or the bare mark when
/// the detail fetch failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedItem<M, D> {
    #[serde(flatten)]
    pub mark: M,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<D>,
}

impl<M, D> EnrichedItem<M, D> {
    pub fn enriched(mark: M, detail: D) -> Self {
        EnrichedItem {
            mark,
            detail: Some(detail),
        }
    }

    pub fn bare(mark: M) -> Self {
        EnrichedItem { mark, detail: None }
    }

    pub fn is_degraded(&self) -> bool {
        self.detail.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct TestMark {
        id: String,
        title: String,
    }

    #[test]
    fn test_cursor_trims_and_detects_start() {
        assert!(Cursor::start().is_start());
        assert!(Cursor::new("  \n").is_start());
        let cursor = Cursor::new("abc123\n");
        assert_eq!(cursor.as_str(), "abc123");
        assert!(!cursor.is_start());
    }

    #[test]
    fn test_enriched_item_flattens_mark_and_adds_detail() {
        let item = EnrichedItem::enriched(
            TestMark {
                id: "n1".into(),
                title: "早餐".into(),
            },
            json!({"desc": "full"}),
        );
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({"id": "n1", "title": "早餐", "detail": {"desc": "full"}})
        );
    }

    #[test]
    fn test_bare_item_has_no_detail_key() {
        let item: EnrichedItem<TestMark, serde_json::Value> = EnrichedItem::bare(TestMark {
            id: "n2".into(),
            title: "t".into(),
        });
        assert!(item.is_degraded());
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value, json!({"id": "n2", "title": "t"}));
    }
}
