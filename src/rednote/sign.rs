// ABOUTME: Request signing hook for rednote's web API
// ABOUTME: Signatures come from fixed headers or an external signer program

use crate::{auth::CookieJar, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

/// What a signer sees for one outgoing request.
#[derive(Debug, Serialize)]
pub struct SignRequest<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub params: &'a [(&'a str, String)],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<&'a Value>,
    pub cookies: &'a CookieJar,
}

pub trait RequestSigner {
    /// Extra headers to attach to the request.
    fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<(String, String)>>;
}

#[derive(Debug, Default)]
pub struct NoSigner;

impl RequestSigner for NoSigner {
    fn sign(&self, _request: &SignRequest<'_>) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct StaticHeaders(BTreeMap<String, String>);

impl StaticHeaders {
    pub fn new(headers: BTreeMap<String, String>) -> Self {
        StaticHeaders(headers)
    }
}

impl RequestSigner for StaticHeaders {
    fn sign(&self, _request: &SignRequest<'_>) -> Result<Vec<(String, String)>> {
        Ok(self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Runs an external program per request: the request is written to its stdin
/// as JSON and a JSON object of header names to values is read from stdout.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
}

impl CommandSigner {
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Config("rednote.signer.command must not be empty".into()))?;
        Ok(CommandSigner {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl RequestSigner for CommandSigner {
    fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<(String, String)>> {
        let input = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Signing(format!("failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .map_err(|e| Error::Signing(format!("failed to write request: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Signing(format!("{} did not finish: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::Signing(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let headers: BTreeMap<String, String> = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Signing(format!("signer output is not a header map: {}", e)))?;
        Ok(headers.into_iter().collect())
    }
}

/// `signer:` section of the rednote config; at most one of the fields is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

pub fn build_signer(config: Option<&SignerConfig>) -> Result<Box<dyn RequestSigner>> {
    let Some(config) = config else {
        return Ok(Box::new(NoSigner));
    };
    match (&config.headers, &config.command) {
        (Some(_), Some(_)) => Err(Error::Config(
            "rednote.signer takes either headers or command, not both".into(),
        )),
        (Some(headers), None) => Ok(Box::new(StaticHeaders::new(headers.clone()))),
        (None, Some(argv)) => Ok(Box::new(CommandSigner::new(argv)?)),
        (None, None) => Ok(Box::new(NoSigner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(cookies: &'a CookieJar, params: &'a [(&'a str, String)]) -> SignRequest<'a> {
        SignRequest {
            method: "GET",
            uri: "/api/sns/web/v2/note/collect/page",
            params,
            payload: None,
            cookies,
        }
    }

    #[test]
    fn test_static_headers_are_returned() {
        let mut headers = BTreeMap::new();
        headers.insert("x-s".to_string(), "sig".to_string());
        headers.insert("x-t".to_string(), "1700000000000".to_string());
        let signer = StaticHeaders::new(headers);

        let jar = CookieJar::default();
        let out = signer.sign(&request(&jar, &[])).unwrap();
        assert_eq!(
            out,
            vec![
                ("x-s".to_string(), "sig".to_string()),
                ("x-t".to_string(), "1700000000000".to_string())
            ]
        );
    }

    #[test]
    fn test_sign_request_serializes_params_and_cookies() {
        let jar = CookieJar::default().with("a1", "abc");
        let params = [("num", "20".to_string())];
        let value = serde_json::to_value(request(&jar, &params)).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["params"][0][0], "num");
        assert_eq!(value["cookies"]["a1"], "abc");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_empty_command_is_config_error() {
        let err = CommandSigner::new(&[]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    #[cfg(unix)]
    fn test_command_signer_reads_header_map() {
        let signer = CommandSigner::new(&[
            "sh".to_string(),
            "-c".to_string(),
            r#"cat >/dev/null; printf '{"x-s":"from-cmd"}'"#.to_string(),
        ])
        .unwrap();
        let jar = CookieJar::default();
        let out = signer.sign(&request(&jar, &[])).unwrap();
        assert_eq!(out, vec![("x-s".to_string(), "from-cmd".to_string())]);
    }

    #[test]
    #[cfg(unix)]
    fn test_command_signer_failure() {
        let signer = CommandSigner::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "cat >/dev/null; echo nope >&2; exit 3".to_string(),
        ])
        .unwrap();
        let jar = CookieJar::default();
        let err = signer.sign(&request(&jar, &[])).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_signer_config_yaml_shapes() {
        let cfg: SignerConfig = serde_yaml::from_str("command: [python, sign.py]").unwrap();
        assert_eq!(
            cfg.command,
            Some(vec!["python".to_string(), "sign.py".to_string()])
        );
        assert!(build_signer(Some(&cfg)).is_ok());

        let cfg: SignerConfig = serde_yaml::from_str("headers:\n  x-s: abc").unwrap();
        assert_eq!(cfg.headers.unwrap().get("x-s").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_signer_config_rejects_both_shapes() {
        let cfg: SignerConfig =
            serde_yaml::from_str("headers:\n  x-s: abc\ncommand: [sign]").unwrap();
        assert!(matches!(build_signer(Some(&cfg)), Err(Error::Config(_))));
    }
}
