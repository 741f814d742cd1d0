//! Settings loading for hosts that configure the bridge from files or the
//! environment rather than from code.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use lb_core::{ConfigureOptions, Environment};
use serde::{Deserialize, Serialize};

/// Bridge settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SDK key issued for the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_key: Option<String>,
    /// Backend environment.
    pub environment: Environment,
    /// Arm native URL capture on configure.
    pub auto_handle_deep_links: bool,
    /// Track native install/open notifications automatically.
    pub track_lifecycle: bool,
    /// Force debug-level logging.
    pub debug: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("sdk_key", &self.sdk_key.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("auto_handle_deep_links", &self.auto_handle_deep_links)
            .field("track_lifecycle", &self.track_lifecycle)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        let options = ConfigureOptions::default();
        Self {
            sdk_key: None,
            environment: Environment::default(),
            auto_handle_deep_links: options.auto_handle_deep_links,
            track_lifecycle: options.track_lifecycle,
            debug: false,
        }
    }
}

impl Settings {
    /// Loads settings from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads settings, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // LINKBRIDGE_SDK_KEY, LINKBRIDGE_ENVIRONMENT, ...
        figment = figment.merge(Env::prefixed("LINKBRIDGE_"));

        figment.extract()
    }

    /// The `configure` options these settings describe.
    pub const fn options(&self) -> ConfigureOptions {
        ConfigureOptions {
            auto_handle_deep_links: self.auto_handle_deep_links,
            track_lifecycle: self.track_lifecycle,
        }
    }
}

/// Returns the platform-specific config directory for linkbridge.
///
/// On Linux: `~/.config/linkbridge`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("linkbridge"))
}
