//! Client configuration.
//!
//! The core reads no environment variables; callers build a [`ClientConfig`]
//! (usually from CLI flags) and hand it to [`crate::connect`].

use std::path::PathBuf;
use std::time::Duration;

use crate::address;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PLUGIN_NAME: &str = "AIVTuber";
pub const DEFAULT_PLUGIN_DEVELOPER: &str = "AIVTuber Dev";

/// The plugin identity a token is issued to. Changing it requires a new token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginIdentity {
    pub plugin_name: String,
    pub plugin_developer: String,
}

impl Default for PluginIdentity {
    fn default() -> Self {
        Self {
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
            plugin_developer: DEFAULT_PLUGIN_DEVELOPER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit host override, used unmodified. `None` means derive it from
    /// the local machine name.
    pub host: Option<String>,
    pub port: u16,
    pub token_path: PathBuf,
    pub connect_timeout: Duration,
    pub identity: PluginIdentity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            token_path: crate::credential::default_token_path(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            identity: PluginIdentity::default(),
        }
    }
}

impl ClientConfig {
    /// `ws://{host}:{port}` after address resolution. A host override that
    /// already carries a `ws://` or `wss://` scheme is returned as-is.
    pub fn websocket_url(&self) -> String {
        if let Some(host) = self.host.as_deref() {
            if host.starts_with("ws://") || host.starts_with("wss://") {
                return host.to_string();
            }
        }
        let host = address::resolve_host(self.host.as_deref());
        address::websocket_url(&host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_host_application_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 8001);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.identity.plugin_name, "AIVTuber");
        assert_eq!(config.identity.plugin_developer, "AIVTuber Dev");
        assert_eq!(
            config.token_path,
            PathBuf::from("extensions")
                .join("vtube_studio")
                .join("auth_token.txt")
        );
    }

    #[test]
    fn explicit_host_is_used_unmodified() {
        let config = ClientConfig {
            host: Some("studio-pc".into()),
            port: 8002,
            ..ClientConfig::default()
        };
        assert_eq!(config.websocket_url(), "ws://studio-pc:8002");
    }

    #[test]
    fn explicit_url_passes_through() {
        let config = ClientConfig {
            host: Some("wss://example.test/api".into()),
            ..ClientConfig::default()
        };
        assert_eq!(config.websocket_url(), "wss://example.test/api");
    }
}
