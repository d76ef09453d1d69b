// ABOUTME: YAML configuration loader and validator
// ABOUTME: Missing default config file yields defaults; explicit paths must exist

use crate::{
    auth::CookieJar,
    bilibili,
    export::DEFAULT_BATCH_SIZE,
    rednote::{self, sign::SignerConfig, DetailSourceKind},
    resume::DEFAULT_CURSOR_FILE,
    Error, Result,
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub export: ExportSettings,
    pub rednote: RednoteSettings,
    pub bilibili: BilibiliSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub batch_size: u32,
    pub cursor_file: PathBuf,
    pub timeout_secs: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            cursor_file: PathBuf::from(DEFAULT_CURSOR_FILE),
            timeout_secs: 30,
        }
    }
}

impl ExportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RednoteSettings {
    pub user_id: String,
    pub cookies: CookieJar,
    pub detail_source: DetailSourceKind,
    pub api_base: String,
    pub web_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerConfig>,
}

impl Default for RednoteSettings {
    fn default() -> Self {
        RednoteSettings {
            user_id: String::new(),
            cookies: CookieJar::default(),
            detail_source: DetailSourceKind::default(),
            api_base: rednote::DEFAULT_API_BASE.into(),
            web_base: rednote::DEFAULT_WEB_BASE.into(),
            signer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilibiliSettings {
    pub up_mid: String,
    pub web_location: String,
    pub cookies: CookieJar,
    pub api_base: String,
}

impl Default for BilibiliSettings {
    fn default() -> Self {
        BilibiliSettings {
            up_mid: String::new(),
            web_location: bilibili::DEFAULT_WEB_LOCATION.into(),
            cookies: CookieJar::default(),
            api_base: bilibili::DEFAULT_API_BASE.into(),
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "marksort").map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the platform config directory,
///   falling back to defaults when that file does not exist.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_path() {
            Some(p) if p.exists() => p,
            _ => {
                debug!("no config file; using defaults");
                return Ok(Config::default());
            }
        },
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let cfg = parse(&content)?;
    debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

pub fn parse(content: &str) -> Result<Config> {
    let cfg: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(content)?
    };
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.export.batch_size == 0 {
        return Err(Error::Config("export.batch_size must be > 0".into()));
    }
    if cfg.export.timeout_secs == 0 {
        return Err(Error::Config("export.timeout_secs must be > 0".into()));
    }
    if cfg.export.cursor_file.as_os_str().is_empty() {
        return Err(Error::Config("export.cursor_file must be non-empty".into()));
    }

    if cfg.rednote.api_base.trim().is_empty() {
        return Err(Error::Config("rednote.api_base must be non-empty".into()));
    }
    if cfg.rednote.web_base.trim().is_empty() {
        return Err(Error::Config("rednote.web_base must be non-empty".into()));
    }
    if let Some(signer) = &cfg.rednote.signer {
        if signer.headers.is_some() && signer.command.is_some() {
            return Err(Error::Config(
                "rednote.signer takes either headers or command, not both".into(),
            ));
        }
        if signer.command.as_ref().is_some_and(|argv| argv.is_empty()) {
            return Err(Error::Config("rednote.signer.command must be non-empty".into()));
        }
    }

    if cfg.bilibili.api_base.trim().is_empty() {
        return Err(Error::Config("bilibili.api_base must be non-empty".into()));
    }
    if cfg.bilibili.web_location.trim().is_empty() {
        return Err(Error::Config("bilibili.web_location must be non-empty".into()));
    }

    Ok(())
}

/// Commented example configuration, as printed by `marksort config example`.
pub fn example() -> &'static str {
    r#"# marksort configuration
export:
  batch_size: 20           # items requested per listing call
  cursor_file: cursor.lock # where the resume cursor is kept
  timeout_secs: 30

rednote:
  user_id: "5f0000000000000000000001"
  # Copy these from a logged-in browser session
  cookies:
    a1: "..."
    webId: "..."
    web_session: "..."
  detail_source: feed      # feed | explore_page
  # signer:
  #   command: ["node", "sign.js"]

bilibili:
  up_mid: "12345678"
  web_location: "333.1387"
  cookies:
    SESSDATA: "..."
"#
}
