// ABOUTME: Blocking client for bilibili favourite folders and video details
// ABOUTME: Maps an item-offset cursor onto the page-numbered listing endpoint

pub mod model;

use crate::{
    auth::CookieJar,
    http::{read_json, HttpSession},
    platform::{Cursor, MarkPage, Platform},
    Error, Result,
};
use model::{Envelope, FolderList, Media, ResourcePage, VideoView};
use std::time::Duration;
use tracing::debug;

pub use model::Folder;

pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";
pub const DEFAULT_WEB_LOCATION: &str = "333.1387";
pub const REFERER: &str = "https://www.bilibili.com/";

const FOLDERS_URI: &str = "/x/v3/fav/folder/created/list-all";
const RESOURCES_URI: &str = "/x/v3/fav/resource/list";
const VIEW_URI: &str = "/x/web-interface/view";

/// Page number and page size that start exactly at `offset` and return at
/// most `size` items: the largest page size dividing the offset.
pub(crate) fn page_request(offset: u64, size: u32) -> (u64, u32) {
    let size = size.max(1);
    let page_size = (1..=size)
        .rev()
        .find(|s| offset % u64::from(*s) == 0)
        .unwrap_or(1);
    (offset / u64::from(page_size) + 1, page_size)
}

fn parse_offset(cursor: &Cursor) -> Result<u64> {
    if cursor.is_start() {
        return Ok(0);
    }
    cursor.as_str().parse().map_err(|_| {
        Error::Config(format!(
            "bilibili cursor must be an item offset, got {:?}",
            cursor.as_str()
        ))
    })
}

pub struct BilibiliClient {
    http: HttpSession,
    api_base: String,
    web_location: String,
}

impl BilibiliClient {
    pub fn new(cookies: &CookieJar, timeout: Duration) -> Result<Self> {
        Ok(BilibiliClient {
            http: HttpSession::new(cookies, REFERER, timeout)?,
            api_base: DEFAULT_API_BASE.into(),
            web_location: DEFAULT_WEB_LOCATION.into(),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_web_location(mut self, web_location: impl Into<String>) -> Self {
        self.web_location = web_location.into();
        self
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        uri: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, uri);
        let response = self.http.get(&url).query(params).send()?;
        let envelope: Envelope<T> = read_json(uri, response)?;
        envelope.into_data(uri)
    }

    pub fn favourite_folders(&self, up_mid: &str) -> Result<Vec<Folder>> {
        let data: FolderList = self.get(
            FOLDERS_URI,
            &[
                ("up_mid", up_mid.to_string()),
                ("web_location", self.web_location.clone()),
            ],
        )?;
        Ok(data.list.unwrap_or_default())
    }

    /// The marks of one folder, as an exportable platform.
    pub fn folder(&self, media_id: i64) -> FolderMarks<'_> {
        FolderMarks {
            client: self,
            media_id,
        }
    }

    pub fn video_view(&self, item_id: &str) -> Result<VideoView> {
        let param = match item_id.strip_prefix("av") {
            Some(aid) if !aid.is_empty() && aid.chars().all(|c| c.is_ascii_digit()) => {
                ("aid", aid.to_string())
            }
            _ => ("bvid", item_id.to_string()),
        };
        self.get(VIEW_URI, &[param])
    }
}

pub struct FolderMarks<'a> {
    client: &'a BilibiliClient,
    media_id: i64,
}

impl Platform for FolderMarks<'_> {
    type Mark = Media;
    type Detail = VideoView;

    fn name(&self) -> &'static str {
        "bilibili"
    }

    fn list_marks(&self, cursor: &Cursor, page_size: u32) -> Result<MarkPage<Media>> {
        let offset = parse_offset(cursor)?;
        let (pn, ps) = page_request(offset, page_size);
        debug!(media_id = self.media_id, offset, pn, ps, "listing folder page");

        let data: ResourcePage = self.client.get(
            RESOURCES_URI,
            &[
                ("media_id", self.media_id.to_string()),
                ("pn", pn.to_string()),
                ("ps", ps.to_string()),
                ("keyword", String::new()),
                ("order", "mtime".to_string()),
                ("type", "0".to_string()),
                ("tid", "0".to_string()),
                ("platform", "web".to_string()),
                ("web_location", self.client.web_location.clone()),
            ],
        )?;

        let marks = data.medias.unwrap_or_default();
        let next = if data.has_more {
            Cursor::new((offset + marks.len() as u64).to_string())
        } else {
            Cursor::start()
        };
        Ok(MarkPage {
            marks,
            has_more: data.has_more,
            next,
        })
    }

    fn get_detail(&self, item_id: &str, _access_token: &str) -> Result<VideoView> {
        self.client.video_view(item_id)
    }

    fn cursor_after(&self, start: &Cursor, taken: usize) -> Option<Cursor> {
        let offset = parse_offset(start).ok()?;
        Some(Cursor::new((offset + taken as u64).to_string()))
    }
}
