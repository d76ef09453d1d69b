// ABOUTME: Serde data models for bilibili favourite-folder and video responses
// ABOUTME: Envelopes with a non-zero code are converted into upstream errors

use crate::{platform::MarkRef, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_data(self, endpoint: &str) -> Result<T> {
        if self.code != 0 {
            return Err(Error::upstream(
                endpoint,
                self.code,
                self.message.unwrap_or_else(|| "unknown".into()),
            ));
        }
        self.data
            .ok_or_else(|| Error::malformed(endpoint, "response has no data field"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FolderList {
    #[serde(default)]
    pub list: Option<Vec<Folder>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResourcePage {
    #[serde(default)]
    pub medias: Option<Vec<Media>>,
    #[serde(default)]
    pub has_more: bool,
}

/// A favourite folder owned by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    #[serde(default)]
    pub fid: i64,
    #[serde(default)]
    pub mid: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub media_count: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A favourited video as returned by the folder listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub media_type: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub bv_id: String,
    #[serde(default)]
    pub bvid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Upper>,
    #[serde(default)]
    pub fav_time: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkRef for Media {
    fn item_id(&self) -> Cow<'_, str> {
        let bv_id = self.bv_id.trim();
        let bvid = self.bvid.trim();
        if !bv_id.is_empty() {
            Cow::Borrowed(bv_id)
        } else if !bvid.is_empty() {
            Cow::Borrowed(bvid)
        } else {
            Cow::Owned(format!("av{}", self.id))
        }
    }

    fn access_token(&self) -> &str {
        ""
    }

    fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Untitled"
        } else {
            title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upper {
    #[serde(default)]
    pub mid: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub face: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full video payload from the view endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoView {
    #[serde(default)]
    pub bvid: String,
    #[serde(default)]
    pub aid: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub pic: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Upper>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
