//! Dify image reference resolution
//!
//! Dify hands out file URLs that are not always absolute. Depending on how
//! the deployment is configured a tool may receive:
//!
//! - a full URL (`https://dify.example.com/files/tools/abc.png?sign=...`),
//! - a path relative to the deployment (`/files/tools/abc.png?sign=...`),
//! - a protocol-relative URL (`//dify.example.com/files/...`).
//!
//! Relative forms are repaired against the deployment's public host URL.

use crate::{Error, Result};
use reqwest::Url;

/// Resolves references against an optional host URL
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    host_url: Option<String>,
}

impl UrlResolver {
    /// Creates a resolver; `host_url` is the public base URL of the Dify
    /// deployment, used for relative references
    pub fn new(host_url: Option<impl Into<String>>) -> Self {
        Self {
            host_url: host_url.map(Into::into),
        }
    }

    pub fn host_url(&self) -> Option<&str> {
        self.host_url.as_deref()
    }

    pub fn resolve(&self, reference: &str) -> Result<Url> {
        resolve_reference(reference, self.host_url.as_deref())
    }
}

/// Turns a raw reference into an absolute http(s) URL
pub fn resolve_reference(reference: &str, host_url: Option<&str>) -> Result<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(malformed("empty reference"));
    }
    if reference.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(malformed(format!("reference contains whitespace: {:?}", reference)));
    }

    let candidate = if is_http(reference) {
        reference.to_string()
    } else if let Some(rest) = reference
        .strip_prefix("//")
        .filter(|rest| !rest.starts_with('/'))
    {
        let scheme = match host_url {
            Some(host) => host_base(host)?.scheme().to_string(),
            None => "https".to_string(),
        };
        format!("{}://{}", scheme, rest)
    } else if let Some(scheme) = scheme_of(reference) {
        return Err(malformed(format!("unsupported scheme '{}'", scheme)));
    } else {
        let host = host_url
            .ok_or_else(|| malformed(format!("relative reference without host URL: {}", reference)))?;
        host_base(host)?;
        format!(
            "{}/{}",
            host.trim().trim_end_matches('/'),
            reference.trim_start_matches('/')
        )
    };

    let url = Url::parse(&candidate)
        .map_err(|e| malformed(format!("{}: {}", candidate, e)))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(malformed(format!("no host in {}", candidate)));
    }
    Ok(url)
}

fn malformed(message: impl Into<String>) -> Error {
    Error::MalformedReference(message.into())
}

fn is_http(reference: &str) -> bool {
    let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Returns the scheme of `reference` if it has one.
///
/// `host:8080/...` is treated as scheme-less, since a port follows the colon.
fn scheme_of(reference: &str) -> Option<&str> {
    let (scheme, rest) = reference.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let is_port = rest.starts_with(|c: char| c.is_ascii_digit());
    (valid && !is_port).then_some(scheme)
}

/// Validates the host URL, which must be an absolute http(s) URL
fn host_base(host: &str) -> Result<Url> {
    let host = host.trim();
    if !is_http(host) {
        return Err(malformed(format!("host URL must be http(s): {}", host)));
    }
    let url = Url::parse(host).map_err(|e| malformed(format!("host URL {}: {}", host, e)))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(malformed(format!("host URL has no host: {}", host)));
    }
    Ok(url)
}
