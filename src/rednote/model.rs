// ABOUTME: Serde data models for rednote collection and feed responses
// ABOUTME: Required identifiers are validated; unknown fields are carried through

use crate::{platform::MarkRef, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_data(self, endpoint: &str) -> Result<T> {
        if !self.success {
            return Err(Error::upstream(
                endpoint,
                self.code,
                self.msg.unwrap_or_else(|| "unknown".into()),
            ));
        }
        self.data
            .ok_or_else(|| Error::malformed(endpoint, "response has no data field"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CollectPage {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub cursor: String,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeedPage {
    #[serde(default)]
    pub items: Vec<FeedNote>,
}

/// A saved note as returned by the collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub xsec_token: String,
    #[serde(default)]
    pub display_title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<Cover>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<NoteUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interact_info: Option<InteractInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkRef for Note {
    fn item_id(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.note_id)
    }

    fn access_token(&self) -> &str {
        &self.xsec_token
    }

    fn display_title(&self) -> &str {
        if self.display_title.is_empty() {
            "Untitled"
        } else {
            &self.display_title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default)]
    pub url_default: String,
    #[serde(default)]
    pub url_pre: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteUser {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractInfo {
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub liked_count: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Detail for one note, from whichever source produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteDetail {
    Feed(Box<FeedNote>),
    Page(PageDetail),
}

impl NoteDetail {
    pub fn image_urls(&self) -> Vec<&str> {
        match self {
            NoteDetail::Feed(note) => note.image_urls(),
            NoteDetail::Page(_) => Vec::new(),
        }
    }

    pub fn video_urls(&self) -> Vec<&str> {
        match self {
            NoteDetail::Feed(note) => note.video_urls(),
            NoteDetail::Page(_) => Vec::new(),
        }
    }

    /// Plain-text digest: title, description, then one image URL per line.
    pub fn summary(&self) -> String {
        let (title, desc) = match self {
            NoteDetail::Feed(note) => (note.note_card.title.as_str(), note.note_card.desc.as_str()),
            NoteDetail::Page(page) => (page.title.as_str(), page.description.as_str()),
        };
        format!(
            "标题：{}\n简介：{}\n图片：{}",
            title,
            desc,
            self.image_urls().join("\n")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedNote {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model_type: String,
    pub note_card: NoteCard,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeedNote {
    pub fn image_urls(&self) -> Vec<&str> {
        self.note_card
            .image_list
            .iter()
            .map(|img| img.url_default.as_str())
            .filter(|url| !url.is_empty())
            .collect()
    }

    /// Master URLs of every rendition, across all codecs.
    pub fn video_urls(&self) -> Vec<&str> {
        let Some(media) = self.note_card.video.as_ref().and_then(|v| v.media.as_ref()) else {
            return Vec::new();
        };
        media
            .stream
            .values()
            .flatten()
            .map(|s| s.master_url.as_str())
            .filter(|url| !url.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteCard {
    #[serde(default)]
    pub note_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(rename = "type", default)]
    pub note_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<NoteUser>,
    #[serde(default)]
    pub image_list: Vec<NoteImage>,
    #[serde(default)]
    pub tag_list: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<NoteVideo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteImage {
    #[serde(default)]
    pub url_default: String,
    #[serde(default)]
    pub url_pre: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub tag_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteVideo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<VideoMedia>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMedia {
    /// Renditions keyed by codec (`h264`, `h265`, `av1`, ...).
    #[serde(default)]
    pub stream: BTreeMap<String, Vec<VideoStream>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    #[serde(default)]
    pub master_url: String,
    #[serde(default)]
    pub backup_urls: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Detail scraped from the legacy explore page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDetail {
    pub title: String,
    pub author: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_note() -> Value {
        json!({
            "note_id": "64f1c0a2000000001e00d0a1",
            "xsec_token": "ABtoken=",
            "display_title": "秋天的第一杯奶茶",
            "type": "normal",
            "cover": {"url_default": "https://sns-img/abc!nd_dft", "url_pre": "https://sns-img/abc!nd_prv", "width": 1080},
            "user": {"user_id": "u1", "nickname": "小红", "avatar": "https://sns-avatar/u1", "xsec_token": "UT"},
            "interact_info": {"liked": false, "liked_count": "1.2万"}
        })
    }

    #[test]
    fn test_note_deserialize_and_keep_unknown_fields() {
        let note: Note = serde_json::from_value(sample_note()).unwrap();
        assert_eq!(note.item_id(), "64f1c0a2000000001e00d0a1");
        assert_eq!(note.access_token(), "ABtoken=");
        assert_eq!(note.note_type.as_deref(), Some("normal"));

        let back = serde_json::to_value(&note).unwrap();
        assert_eq!(back, sample_note());
    }

    #[test]
    fn test_note_missing_token_is_rejected() {
        let result: std::result::Result<Note, _> =
            serde_json::from_value(json!({"note_id": "n1", "display_title": "t"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_untitled_display_title() {
        let note: Note =
            serde_json::from_value(json!({"note_id": "n1", "xsec_token": "t"})).unwrap();
        assert_eq!(note.display_title(), "Untitled");
    }

    #[test]
    fn test_envelope_failure_is_upstream() {
        let env: Envelope<CollectPage> =
            serde_json::from_value(json!({"success": false, "code": -100, "msg": "登录已过期"}))
                .unwrap();
        match env.into_data("/collect") {
            Err(Error::Upstream { code, message, .. }) => {
                assert_eq!(code, -100);
                assert_eq!(message, "登录已过期");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_success_without_data_is_malformed() {
        let env: Envelope<CollectPage> =
            serde_json::from_value(json!({"success": true, "code": 0})).unwrap();
        assert!(matches!(
            env.into_data("/collect"),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_feed_note_media_urls() {
        let note: FeedNote = serde_json::from_value(json!({
            "id": "n1",
            "model_type": "note",
            "note_card": {
                "note_id": "n1",
                "title": "t",
                "desc": "d",
                "type": "video",
                "image_list": [{"url_default": "https://img/1"}, {"url_default": ""}],
                "video": {"media": {"stream": {
                    "h264": [{"master_url": "https://v/h264.mp4"}],
                    "h265": [{"master_url": "https://v/h265.mp4"}, {"master_url": "https://v/h265b.mp4"}],
                    "av1": []
                }}}
            }
        }))
        .unwrap();

        assert_eq!(note.image_urls(), vec!["https://img/1"]);
        assert_eq!(
            note.video_urls(),
            vec!["https://v/h264.mp4", "https://v/h265.mp4", "https://v/h265b.mp4"]
        );
    }

    #[test]
    fn test_note_detail_untagged_variants() {
        let page: NoteDetail = serde_json::from_value(json!({
            "title": "t", "author": "a", "description": "d", "tags": ["#x"]
        }))
        .unwrap();
        assert!(matches!(page, NoteDetail::Page(_)));
        assert!(page.image_urls().is_empty());

        let feed: NoteDetail = serde_json::from_value(json!({
            "id": "n1", "note_card": {"title": "t"}
        }))
        .unwrap();
        assert!(matches!(feed, NoteDetail::Feed(_)));
    }

    #[test]
    fn test_tag_keeps_unknown_fields() {
        let raw = json!({"id": "t1", "name": "早餐", "type": "topic", "link": "/page/topics/t1"});
        let tag: Tag = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tag.extra.get("link"), Some(&json!("/page/topics/t1")));
        assert_eq!(serde_json::to_value(&tag).unwrap(), raw);
    }

    #[test]
    fn test_envelope_without_data_key_deserializes() {
        let env: Envelope<FeedPage> =
            serde_json::from_value(json!({"success": true, "code": 0})).unwrap();
        assert!(env.data.is_none());
    }

    #[test]
    fn test_note_detail_summary() {
        let feed: NoteDetail = serde_json::from_value(json!({
            "note_card": {
                "title": "早餐",
                "desc": "燕麦",
                "image_list": [{"url_default": "https://img/1"}, {"url_default": "https://img/2"}]
            }
        }))
        .unwrap();
        assert_eq!(
            feed.summary(),
            "标题：早餐\n简介：燕麦\n图片：https://img/1\nhttps://img/2"
        );

        let page = NoteDetail::Page(PageDetail {
            title: "t".into(),
            author: "a".into(),
            description: "d".into(),
            tags: vec![],
        });
        assert_eq!(page.summary(), "标题：t\n简介：d\n图片：");
    }
}
