//! Host page addressing: where the SDK connects and which package it is.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PLUGIN_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/SharexApp/([\w-]+)(?:/[^/]+)*/?").expect("valid plugin path pattern")
});

/// Address of the page hosting the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLocation {
    /// Host name serving the page.
    pub hostname: String,
    /// Port serving the page; the socket listens one above it.
    pub port: u16,
    /// Path of the page.
    pub pathname: String,
}

impl HostLocation {
    /// Create a location from its parts.
    pub fn new(hostname: impl Into<String>, port: u16, pathname: impl Into<String>) -> Self {
        Self { hostname: hostname.into(), port, pathname: pathname.into() }
    }

    /// Parse a page address such as `http://10.0.0.2:8080/SharexApp/chess-club/index.html`.
    ///
    /// The port is required: the socket address is derived from it. A
    /// missing scheme is read as `http`.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim();
        let parsed = if trimmed.contains("://") {
            Url::parse(trimmed)
        } else {
            Url::parse(&format!("http://{trimmed}"))
        };
        let parsed = parsed.map_err(|e| match e {
            url::ParseError::InvalidPort => ConfigError::InvalidPort(url.to_string()),
            other => ConfigError::InvalidLocation(format!("{url}: {other}")),
        })?;

        let hostname = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ConfigError::InvalidLocation(url.to_string()))?;
        let port = parsed
            .port()
            .ok_or_else(|| ConfigError::InvalidPort(format!("no port in {url}")))?;
        let pathname = match parsed.path() {
            "" => "/",
            path => path,
        };

        Ok(Self::new(hostname, port, pathname))
    }

    /// Package name derived from the page path.
    pub fn package_name(&self) -> String {
        package_name_from_path(&self.pathname)
    }
}

/// Extract the plugin id from a `/SharexApp/<id>/...` path.
///
/// Returns an empty string when the path does not name a plugin.
pub fn extract_plugin_uid(path: &str) -> &str {
    PLUGIN_PATH
        .captures(path)
        .and_then(|captures| captures.get(1))
        .map_or("", |m| m.as_str())
}

/// Package name for a page path: the plugin id with `-` replaced by `.`.
pub fn package_name_from_path(path: &str) -> String {
    extract_plugin_uid(path).replace('-', ".")
}
