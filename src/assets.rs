// ABOUTME: Batch downloader for images referenced by an exported batch
// ABOUTME: Names files after the URL's last path segment; failures are skipped

use crate::{
    auth::CookieJar,
    http::HttpSession,
    rednote::model::NoteDetail,
    Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AssetPlatform {
    Rednote,
    Bilibili,
}

impl AssetPlatform {
    /// JSON pointers of the image fields carried by every exported item.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            AssetPlatform::Rednote => &["/cover/url_default", "/user/avatar"],
            AssetPlatform::Bilibili => &["/cover", "/upper/face"],
        }
    }

    pub fn referer(self) -> &'static str {
        match self {
            AssetPlatform::Rednote => crate::rednote::REFERER,
            AssetPlatform::Bilibili => crate::bilibili::REFERER,
        }
    }
}

/// Local file name for an asset URL: the last path segment with any `!`
/// resize suffix and the query removed, plus `.jpg` when it has no extension.
pub fn asset_file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    let name = segment.split('!').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }

    if Path::new(name).extension().is_some() {
        Some(name.to_string())
    } else {
        Some(format!("{}.{}", name, DEFAULT_EXTENSION))
    }
}

/// Every asset URL referenced by `items`, in order, without repeats.
pub fn collect_urls(items: &[Value], platform: AssetPlatform, detail_media: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    let mut push = |url: &str| {
        if !url.is_empty() && seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    };

    for item in items {
        for pointer in platform.fields() {
            if let Some(url) = item.pointer(pointer).and_then(Value::as_str) {
                push(url);
            }
        }

        if detail_media && platform == AssetPlatform::Rednote {
            let detail = item
                .get("detail")
                .and_then(|d| serde_json::from_value::<NoteDetail>(d.clone()).ok());
            if let Some(detail) = detail {
                for url in detail.image_urls().into_iter().chain(detail.video_urls()) {
                    push(url);
                }
            }
        }
    }

    urls
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Downloaded,
    Skipped,
    Failed,
}

pub struct AssetDownloader {
    http: HttpSession,
    skip_existing: bool,
}

impl AssetDownloader {
    pub fn new(platform: AssetPlatform, timeout: Duration) -> Result<Self> {
        Ok(AssetDownloader {
            http: HttpSession::new(&CookieJar::default(), platform.referer(), timeout)?,
            skip_existing: false,
        })
    }

    /// Leave files that already exist in the target directory untouched.
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    pub fn download_all(&self, urls: &[String], dir: &Path) -> Result<DownloadReport> {
        fs::create_dir_all(dir)?;

        let pb = ProgressBar::new(urls.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} assets") {
            pb.set_style(style.progress_chars("##-"));
        }

        let mut report = DownloadReport::default();
        for url in urls {
            match self.download_one(url, dir) {
                Outcome::Downloaded => report.downloaded += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!(
            "{} downloaded, {} skipped, {} failed",
            report.downloaded, report.skipped, report.failed
        ));
        Ok(report)
    }

    fn download_one(&self, url: &str, dir: &Path) -> Outcome {
        let Some(name) = asset_file_name(url) else {
            warn!(%url, "cannot derive a file name; skipping");
            return Outcome::Failed;
        };
        let target: PathBuf = dir.join(&name);

        if self.skip_existing && target.exists() {
            debug!(path = %target.display(), "already downloaded");
            return Outcome::Skipped;
        }

        let response = match self.http.get(url).send() {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, error = %e, "download failed");
                return Outcome::Failed;
            }
        };

        if response.status() != StatusCode::OK {
            warn!(%url, status = %response.status(), "download refused");
            return Outcome::Failed;
        }

        let written = response
            .bytes()
            .map_err(crate::Error::from)
            .and_then(|bytes| fs::write(&target, &bytes).map_err(crate::Error::from));
        match written {
            Ok(()) => Outcome::Downloaded,
            Err(e) => {
                warn!(%url, path = %target.display(), error = %e, "could not save asset");
                Outcome::Failed
            }
        }
    }
}
