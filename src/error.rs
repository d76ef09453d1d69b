// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Separates upstream refusals, transport failures, and malformed payloads

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing credentials: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream error {code} on {endpoint}: {message}")]
    Upstream {
        endpoint: String,
        code: i64,
        message: String,
    },

    #[error("Malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request signing failed: {0}")]
    Signing(String),
}

impl Error {
    pub fn upstream(endpoint: &str, code: i64, message: impl Into<String>) -> Self {
        Error::Upstream {
            endpoint: endpoint.into(),
            code,
            message: message.into(),
        }
    }

    pub fn malformed(endpoint: &str, message: impl Into<String>) -> Self {
        Error::Malformed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Auth(_) => 2,
            Error::Transport(_) => 3,
            Error::Upstream { .. } => 4,
            Error::Malformed { .. } => 5,
            Error::Parse(_) => 5,
            Error::Filesystem(_) => 6,
            Error::Config(_) => 7,
            Error::Signing(_) => 8,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::Auth("test".into()).exit_code(), 2);
        assert_eq!(Error::upstream("/feed", 300013, "rate limited").exit_code(), 4);
        assert_eq!(Error::malformed("/feed", "missing data").exit_code(), 5);
        assert_eq!(Error::Config("bad".into()).exit_code(), 7);
        assert_eq!(Error::Signing("boom".into()).exit_code(), 8);
    }

    #[test]
    fn test_upstream_display_carries_code_and_message() {
        let err = Error::upstream("/x/v3/fav/resource/list", -101, "账号未登录");
        let text = err.to_string();
        assert!(text.contains("-101"));
        assert!(text.contains("账号未登录"));
        assert!(text.contains("/x/v3/fav/resource/list"));
    }

    #[test]
    fn test_yaml_error_maps_to_config() {
        let err: Error = serde_yaml::from_str::<u32>("[not a number").unwrap_err().into();
        assert!(matches!(err, Error::Config(_)));
    }
}
