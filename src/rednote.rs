// ABOUTME: Blocking client for rednote's collection and note-detail endpoints
// ABOUTME: Detail retrieval is a pluggable source: feed endpoint or explore page

pub mod model;
pub mod page;
pub mod sign;

use crate::{
    auth::CookieJar,
    http::{read_json, read_text, HttpSession},
    platform::{Cursor, MarkPage, Platform},
    Error, Result,
};
use model::{CollectPage, Envelope, FeedPage, Note, NoteDetail};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sign::{NoSigner, RequestSigner, SignRequest};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub use model::{FeedNote, PageDetail};

pub const DEFAULT_API_BASE: &str = "https://edith.xiaohongshu.com";
pub const DEFAULT_WEB_BASE: &str = "https://www.xiaohongshu.com";
pub const REFERER: &str = "https://www.xiaohongshu.com/";

const COLLECT_URI: &str = "/api/sns/web/v2/note/collect/page";
const FEED_URI: &str = "/api/sns/web/v1/feed";
const EXPLORE_URI: &str = "/explore";
const IMAGE_FORMATS: [&str; 3] = ["jpg", "webp", "avif"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DetailSourceKind {
    /// Structured `/api/sns/web/v1/feed` endpoint
    #[default]
    Feed,
    /// Legacy HTML explore page
    ExplorePage,
}

/// Transport state shared by every request to the platform.
pub struct Session {
    http: HttpSession,
    cookies: CookieJar,
    signer: Box<dyn RequestSigner>,
    api_base: String,
    web_base: String,
}

impl Session {
    fn signed_headers(
        &self,
        method: &str,
        uri: &str,
        params: &[(&str, String)],
        payload: Option<&serde_json::Value>,
    ) -> Result<Vec<(String, String)>> {
        self.signer.sign(&SignRequest {
            method,
            uri,
            params,
            payload,
            cookies: &self.cookies,
        })
    }
}

/// A way of fetching one note's detail.
pub trait DetailSource {
    fn fetch(&self, session: &Session, note_id: &str, xsec_token: &str) -> Result<NoteDetail>;
}

#[derive(Debug, Default)]
pub struct FeedEndpoint;

impl DetailSource for FeedEndpoint {
    fn fetch(&self, session: &Session, note_id: &str, xsec_token: &str) -> Result<NoteDetail> {
        let payload = json!({
            "source_note_id": note_id,
            "image_formats": IMAGE_FORMATS,
            "extra": { "need_body_topic": "1" },
            "xsec_source": "pc_user",
            "xsec_token": xsec_token,
        });
        let headers = session.signed_headers("POST", FEED_URI, &[], Some(&payload))?;

        let url = format!("{}{}", session.api_base, FEED_URI);
        let mut request = session.http.post(&url).json(&payload);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let envelope: Envelope<FeedPage> = read_json(FEED_URI, request.send()?)?;
        let code = envelope.code;
        let page = envelope.into_data(FEED_URI)?;
        let detail = page
            .items
            .into_iter()
            .next()
            .map(|note| NoteDetail::Feed(Box::new(note)))
            .ok_or_else(|| Error::upstream(FEED_URI, code, format!("no items returned for note {}", note_id)))?;
        debug!(note = note_id, summary = %detail.summary(), "fetched note");
        Ok(detail)
    }
}

/// Public web link of a note; the token is required to open it.
pub fn explore_url(web_base: &str, note_id: &str, xsec_token: &str) -> Result<Url> {
    let base = format!("{}{}/{}", web_base.trim_end_matches('/'), EXPLORE_URI, note_id);
    Url::parse_with_params(&base, &[("xsec_token", xsec_token)])
        .map_err(|e| Error::Config(format!("invalid rednote web base {}: {}", web_base, e)))
}

#[derive(Debug, Default)]
pub struct ExplorePage;

impl DetailSource for ExplorePage {
    fn fetch(&self, session: &Session, note_id: &str, xsec_token: &str) -> Result<NoteDetail> {
        let url = explore_url(&session.web_base, note_id, xsec_token)?;
        let response = session.http.get(url.as_str()).send()?;
        let html = read_text(EXPLORE_URI, response)?;
        Ok(NoteDetail::Page(page::parse_explore_page(EXPLORE_URI, &html)?))
    }
}

pub fn detail_source(kind: DetailSourceKind) -> Box<dyn DetailSource> {
    match kind {
        DetailSourceKind::Feed => Box::new(FeedEndpoint),
        DetailSourceKind::ExplorePage => Box::new(ExplorePage),
    }
}

pub struct RedNoteClient {
    session: Session,
    user_id: String,
    detail: Box<dyn DetailSource>,
}

impl RedNoteClient {
    pub fn new(cookies: CookieJar, user_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = HttpSession::new(&cookies, REFERER, timeout)?;
        Ok(RedNoteClient {
            session: Session {
                http,
                cookies,
                signer: Box::new(NoSigner),
                api_base: DEFAULT_API_BASE.into(),
                web_base: DEFAULT_WEB_BASE.into(),
            },
            user_id: user_id.into(),
            detail: Box::new(FeedEndpoint),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.session.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_web_base(mut self, base: impl Into<String>) -> Self {
        self.session.web_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_signer(mut self, signer: Box<dyn RequestSigner>) -> Self {
        self.session.signer = signer;
        self
    }

    pub fn with_detail_source(mut self, source: Box<dyn DetailSource>) -> Self {
        self.detail = source;
        self
    }
}

impl Platform for RedNoteClient {
    type Mark = Note;
    type Detail = NoteDetail;

    fn name(&self) -> &'static str {
        "rednote"
    }

    fn item_noun(&self) -> &'static str {
        "Note"
    }

    fn list_marks(&self, cursor: &Cursor, page_size: u32) -> Result<MarkPage<Note>> {
        let params = [
            ("num", page_size.to_string()),
            ("cursor", cursor.as_str().to_string()),
            ("user_id", self.user_id.clone()),
            ("image_formats", IMAGE_FORMATS.join(",")),
            ("xsec_token", String::new()),
            ("xsec_source", String::new()),
        ];
        let headers = self
            .session
            .signed_headers("GET", COLLECT_URI, &params, None)?;

        let url = format!("{}{}", self.session.api_base, COLLECT_URI);
        let mut request = self.session.http.get(&url).query(&params);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let envelope: Envelope<CollectPage> = read_json(COLLECT_URI, request.send()?)?;
        let page = envelope.into_data(COLLECT_URI)?;
        Ok(MarkPage {
            marks: page.notes,
            has_more: page.has_more,
            next: Cursor::new(page.cursor),
        })
    }

    fn get_detail(&self, item_id: &str, access_token: &str) -> Result<NoteDetail> {
        self.detail.fetch(&self.session, item_id, access_token)
    }
}
