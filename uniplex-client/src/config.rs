//! Client configuration, loadable from TOML.

use crate::error::{ClientError, Result};
use crate::types::Application;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default universe directory host.
pub const DEFAULT_UNIVERSE_HOST: &str = "universe.uniplex.net";

/// Default universe directory port.
pub const DEFAULT_UNIVERSE_PORT: u16 = 57000;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Configuration for a [`Client`](crate::Client).
///
/// Credentials are opaque strings handed to the transport as-is. Every field
/// has a default so a partial TOML document is enough:
///
/// ```toml
/// username = "operator"
/// password = "hunter2"
/// bot_name = "Greeter"
///
/// [application]
/// name = "greeter-bot"
/// version = "0.3"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Universe server host.
    #[serde(default = "default_host")]
    pub universe_host: String,
    /// Universe server port.
    #[serde(default = "default_port")]
    pub universe_port: u16,
    /// Account username.
    #[serde(default)]
    pub username: String,
    /// Account password.
    #[serde(default)]
    pub password: String,
    /// Name this client's avatar appears under.
    #[serde(default)]
    pub bot_name: String,
    /// Application identity reported at login.
    #[serde(default)]
    pub application: Application,
    /// Deadline, in seconds, for every awaited request.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Whether to pre-load the origin cell's objects on world entry.
    #[serde(default)]
    pub auto_query: bool,
}

fn default_host() -> String {
    DEFAULT_UNIVERSE_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_UNIVERSE_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            universe_host: default_host(),
            universe_port: default_port(),
            username: String::new(),
            password: String::new(),
            bot_name: String::new(),
            application: Application::default(),
            request_timeout_secs: default_timeout_secs(),
            auto_query: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`ClientError::IncompleteConfig`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ClientError::IncompleteConfig(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::IncompleteConfig(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// The per-request deadline as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks that the fields login needs are present.
    pub(crate) fn require_credentials(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(ClientError::IncompleteConfig("username is empty".into()));
        }
        if self.password.trim().is_empty() {
            return Err(ClientError::IncompleteConfig("password is empty".into()));
        }
        if self.bot_name.trim().is_empty() {
            return Err(ClientError::IncompleteConfig("bot_name is empty".into()));
        }
        Ok(())
    }
}
