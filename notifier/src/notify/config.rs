// Environment configuration for the notifier
// Handles gateway socket location and per-user delivery toggles

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

/// Default app origin used to build action links when none is configured
static DEFAULT_APP_ORIGIN: Lazy<String> = Lazy::new(|| {
    std::env::var("TINYOUI_APP_ORIGIN").unwrap_or_else(|_| "https://tinyiou.com".to_string())
});

/// Configuration for gateway paths and delivery toggles
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the gateway socket
    pub gateway_dir: PathBuf,
    /// Path to the gateway Unix socket
    pub socket_path: PathBuf,
    /// Origin used to build toast action links (chat page, profile page)
    pub app_origin: String,
    /// Whether the chime plays on delivery
    pub sound_enabled: bool,
    /// Whether desktop notification escapes may be emitted
    pub desktop_alerts_enabled: bool,
}

impl Config {
    /// Create configuration using default paths
    pub fn default_paths() -> Self {
        let gateway_dir = Self::default_gateway_dir();
        Self::with_gateway_dir(gateway_dir)
    }

    /// Create configuration rooted at an explicit gateway directory
    pub fn with_gateway_dir<P: AsRef<Path>>(dir: P) -> Self {
        let gateway_dir = dir.as_ref().to_path_buf();
        Self {
            socket_path: gateway_dir.join("gateway.sock"),
            gateway_dir,
            app_origin: DEFAULT_APP_ORIGIN.clone(),
            sound_enabled: true,
            desktop_alerts_enabled: true,
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    ///
    /// `TINYOUI_GATEWAY_DIR` overrides the socket location; `TINYOUI_MUTE`
    /// silences the chime and `TINYOUI_DESKTOP_ALERTS=off` suppresses the
    /// desktop notification channel.
    pub fn from_env() -> Self {
        let mut config = if let Ok(override_dir) = std::env::var("TINYOUI_GATEWAY_DIR") {
            Self::with_gateway_dir(PathBuf::from(override_dir))
        } else {
            Self::default_paths()
        };

        if std::env::var("TINYOUI_MUTE").is_ok() {
            config.sound_enabled = false;
        }

        if let Ok(v) = std::env::var("TINYOUI_DESKTOP_ALERTS") {
            if v == "off" || v == "0" {
                config.desktop_alerts_enabled = false;
            }
        }

        config
    }

    /// Get the default gateway directory
    fn default_gateway_dir() -> PathBuf {
        // All platforms: ~/.tinyoui/ (or /tmp/tinyoui if home unavailable)
        dirs::home_dir()
            .map(|h| h.join(".tinyoui"))
            .unwrap_or_else(|| PathBuf::from("/tmp/tinyoui"))
    }

    /// Check if the gateway socket exists (indicating the gateway may be up)
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }
}
