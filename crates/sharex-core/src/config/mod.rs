//! Client options and connection addressing.

pub mod location;

use crate::correlator::CorrelationMode;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

pub use location::{HostLocation, extract_plugin_uid, package_name_from_path};

/// Default delay between a lost connection and the next attempt.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 3000;

/// Package name reported when connecting through a debug endpoint.
pub const DEBUG_PACKAGE_NAME: &str = "debug";

fn default_reconnect_interval() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

/// Explicit host/port, bypassing page-derived addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEndpoint {
    /// Host name of the page server.
    pub host: String,
    /// Port of the page server; the socket listens one above it.
    pub port: u16,
}

/// Options accepted when constructing a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkOptions {
    /// Reuse the session id kept in storage across runs.
    #[serde(default)]
    pub preserve_session_id: bool,
    /// Connect to a fixed endpoint instead of the page location.
    #[serde(default)]
    pub debug: Option<DebugEndpoint>,
    /// Reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval: u64,
    /// Public data announced to the host and to other users.
    #[serde(default)]
    pub public_data: Map<String, Value>,
    /// How results are matched to requests.
    #[serde(default)]
    pub correlation: CorrelationMode,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            preserve_session_id: false,
            debug: None,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL_MS,
            public_data: Map::new(),
            correlation: CorrelationMode::Legacy,
        }
    }
}

impl SdkOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options pointing at a debug endpoint.
    #[must_use]
    pub fn debug(host: impl Into<String>, port: u16) -> Self {
        Self { debug: Some(DebugEndpoint { host: host.into(), port }), ..Self::default() }
    }

    /// Reconnect delay as a duration.
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval)
    }

    /// Build options from an untyped JSON value, checking each field.
    ///
    /// Unknown fields are ignored. `debug.port` may be a number or a
    /// numeric string.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let options = value.as_object().ok_or(ConfigError::NotAnObject)?;
        let mut parsed = Self::default();

        if let Some(preserve) = options.get("preserve_session_id") {
            parsed.preserve_session_id = preserve.as_bool().ok_or(ConfigError::InvalidType {
                field: "preserve_session_id",
                expected: "a boolean",
            })?;
        }

        if let Some(debug) = options.get("debug") {
            parsed.debug = Some(parse_debug_endpoint(debug)?);
        }

        if let Some(interval) = options.get("reconnect_interval") {
            let millis = interval
                .as_f64()
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .ok_or(ConfigError::InvalidType {
                    field: "reconnect_interval",
                    expected: "a non-negative number",
                })?;
            parsed.reconnect_interval = millis.round() as u64;
        }

        if let Some(public_data) = options.get("public_data") {
            parsed.public_data = public_data
                .as_object()
                .cloned()
                .ok_or(ConfigError::InvalidType { field: "public_data", expected: "an object" })?;
        }

        if let Some(correlation) = options.get("correlation") {
            parsed.correlation = correlation
                .as_str()
                .and_then(CorrelationMode::parse)
                .ok_or(ConfigError::InvalidType {
                    field: "correlation",
                    expected: "\"legacy\" or \"correlated\"",
                })?;
        }

        Ok(parsed)
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value = toml::from_str(content)?;
        Self::from_value(&value)
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }

    /// Work out where to connect and which package to announce.
    ///
    /// A debug endpoint wins over `location`; without either the options
    /// cannot be used.
    pub fn resolve_target(
        &self,
        location: Option<&HostLocation>,
    ) -> Result<ConnectionTarget, ConfigError> {
        let (hostname, page_port, package_name) = match (&self.debug, location) {
            (Some(debug), _) => (debug.host.clone(), debug.port, DEBUG_PACKAGE_NAME.to_string()),
            (None, Some(location)) => {
                (location.hostname.clone(), location.port, location.package_name())
            }
            (None, None) => return Err(ConfigError::MissingLocation),
        };
        let socket_port = page_port
            .checked_add(1)
            .ok_or_else(|| ConfigError::InvalidPort(format!("{page_port} has no socket port above it")))?;

        Ok(ConnectionTarget { hostname, socket_port, package_name })
    }
}

fn parse_debug_endpoint(debug: &Value) -> Result<DebugEndpoint, ConfigError> {
    let debug = debug
        .as_object()
        .ok_or(ConfigError::InvalidType { field: "debug", expected: "an object" })?;
    let host = debug.get("host").and_then(Value::as_str).ok_or(ConfigError::IncompleteDebug)?;
    let port = match debug.get("port") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| ConfigError::InvalidPort(n.to_string()))?,
        Some(Value::String(s)) => {
            s.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(s.clone()))?
        }
        Some(other) => return Err(ConfigError::InvalidPort(other.to_string())),
        None => return Err(ConfigError::IncompleteDebug),
    };
    Ok(DebugEndpoint { host: host.to_string(), port })
}

/// Resolved connection address and announced package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Host to connect to.
    pub hostname: String,
    /// Socket port (page port plus one).
    pub socket_port: u16,
    /// Package name sent in the handshake.
    pub package_name: String,
}

impl ConnectionTarget {
    /// WebSocket URL of the host.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.hostname, self.socket_port)
    }
}
