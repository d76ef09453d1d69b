// ABOUTME: Blocking HTTP session shared by the platform clients
// ABOUTME: Attaches cookies and browser headers; classifies failed responses

use crate::{auth::CookieJar, Error, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn new(cookies: &CookieJar, referer: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer)
                .map_err(|e| Error::Config(format!("invalid referer {}: {}", referer, e)))?,
        );
        if !cookies.is_empty() {
            let mut value = HeaderValue::from_str(&cookies.to_header())
                .map_err(|e| Error::Auth(format!("cookie value is not a valid header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(HttpSession { client })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        debug!(%url, "GET");
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        debug!(%url, "POST");
        self.client.post(url)
    }
}

fn check_status(endpoint: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().unwrap_or_default();
    let preview = truncate_str(&message, 100);
    Err(Error::upstream(
        endpoint,
        i64::from(status.as_u16()),
        if preview.is_empty() {
            status.to_string()
        } else {
            preview
        },
    ))
}

/// Decode a JSON body into the endpoint's typed envelope.
pub fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
    let body = read_text(endpoint, response)?;
    serde_json::from_str(&body).map_err(|e| {
        Error::malformed(
            endpoint,
            format!("{} (body: {})", e, truncate_str(&body, 200)),
        )
    })
}

pub fn read_text(endpoint: &str, response: Response) -> Result<String> {
    let response = check_status(endpoint, response)?;
    Ok(response.text()?)
}
