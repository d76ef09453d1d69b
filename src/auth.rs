// ABOUTME: Cookie credential bundles with precedence chain
// ABOUTME: CLI flag → config file → environment variable

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

pub const REDNOTE_COOKIE_ENV: &str = "MARKSORT_REDNOTE_COOKIE";
pub const BILIBILI_COOKIE_ENV: &str = "MARKSORT_BILIBILI_COOKIE";

pub const REDNOTE_REQUIRED_COOKIES: &[&str] = &["a1", "webId", "web_session"];
pub const BILIBILI_REQUIRED_COOKIES: &[&str] = &["SESSDATA"];

/// Opaque name/value credential set sent as the `Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar(BTreeMap<String, String>);

impl CookieJar {
    /// Parse a raw `Cookie` header value such as `a1=xxx; webId=yyy`.
    pub fn parse_header(raw: &str) -> Self {
        let mut jar = BTreeMap::new();
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
        CookieJar(jar)
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_header(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn require(&self, names: &[&str], platform: &str) -> Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.get(name).map_or(true, |v| v.is_empty()))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Auth(format!(
                "{} cookies missing: {}",
                platform,
                missing.join(", ")
            )))
        }
    }
}

pub fn resolve_cookies(
    cli_cookie: Option<&str>,
    configured: &CookieJar,
    env_var: &str,
) -> Option<CookieJar> {
    // 1. CLI flag
    if let Some(raw) = cli_cookie {
        let jar = CookieJar::parse_header(raw);
        if !jar.is_empty() {
            return Some(jar);
        }
    }

    // 2. Config file
    if !configured.is_empty() {
        return Some(configured.clone());
    }

    // 3. Environment variable
    if let Ok(raw) = env::var(env_var) {
        let jar = CookieJar::parse_header(&raw);
        if !jar.is_empty() {
            return Some(jar);
        }
    }

    None
}

/// Resolve and validate a platform's credential bundle.
pub fn platform_cookies(
    cli_cookie: Option<&str>,
    configured: &CookieJar,
    env_var: &str,
    required: &[&str],
    platform: &str,
) -> Result<CookieJar> {
    let jar = resolve_cookies(cli_cookie, configured, env_var).ok_or_else(|| {
        Error::Auth(format!(
            "No {} cookies found. Provide via --cookie, the config file, or {}",
            platform, env_var
        ))
    })?;
    jar.require(required, platform)?;
    Ok(jar)
}
