//! SDK configuration values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Environment, SdkKey};

/// Optional keys accepted by `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigureOptions {
    /// Let the native layer intercept incoming URLs and dispatch them
    /// without a manual `handle_universal_link` call.
    pub auto_handle_deep_links: bool,
    /// Turn native install/open lifecycle notifications into
    /// `track_install`/`track_open` calls.
    pub track_lifecycle: bool,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        Self {
            auto_handle_deep_links: true,
            track_lifecycle: true,
        }
    }
}

/// A validated configuration. Replaced wholesale on reconfiguration.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    sdk_key: SdkKey,
    environment: Environment,
    options: ConfigureOptions,
}

impl Configuration {
    pub fn new(
        sdk_key: &str,
        environment: Environment,
        options: ConfigureOptions,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            sdk_key: SdkKey::new(sdk_key)?,
            environment,
            options,
        })
    }

    pub const fn sdk_key(&self) -> &SdkKey {
        &self.sdk_key
    }

    pub const fn environment(&self) -> Environment {
        self.environment
    }

    pub const fn options(&self) -> ConfigureOptions {
        self.options
    }

    pub const fn auto_handle_deep_links(&self) -> bool {
        self.options.auto_handle_deep_links
    }

    pub const fn track_lifecycle(&self) -> bool {
        self.options.track_lifecycle
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("sdk_key", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("options", &self.options)
            .finish()
    }
}
