//! Deep-link payloads delivered by the native layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;

/// Free-form key/value parameters. Keys are unique.
pub type Parameters = serde_json::Map<String, Value>;

/// Query key lifted into [`DeepLinkData::smart_link_id`].
pub const SMART_LINK_ID_PARAM: &str = "smart_link_id";

/// Query key lifted into [`DeepLinkData::click_id`].
pub const CLICK_ID_PARAM: &str = "click_id";

/// A resolved deep link as delivered to listeners.
///
/// Listeners only ever see a shared reference, so a payload cannot change
/// between the first and the last callback of a dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeepLinkData {
    /// The raw URL as received from the OS or native SDK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The path component, e.g. `/product`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Identifier of the smart link that produced this deep link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_link_id: Option<String>,
    /// Identifier of the click that produced this deep link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_id: Option<String>,
    /// Query or attribution parameters.
    pub parameters: Parameters,
}

impl DeepLinkData {
    /// Parses a raw URL into a payload.
    ///
    /// For `http`/`https` links the path is the URL path. For custom schemes
    /// (`myapp://product/42`) the host is treated as the first path segment,
    /// giving `/product/42`. Query values are kept as strings; when a key is
    /// repeated the last value wins.
    pub fn from_url(raw: &str) -> Result<Self, ValidationError> {
        let parsed = Url::parse(raw).map_err(|err| ValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;

        let mut parameters = Parameters::new();
        for (key, value) in parsed.query_pairs() {
            parameters.insert(key.into_owned(), Value::String(value.into_owned()));
        }

        let lookup = |key: &str| {
            parameters
                .get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let smart_link_id = lookup(SMART_LINK_ID_PARAM);
        let click_id = lookup(CLICK_ID_PARAM);

        Ok(Self {
            url: Some(raw.to_string()),
            path: link_path(&parsed),
            smart_link_id,
            click_id,
            parameters,
        })
    }

    /// Adds a parameter, replacing any previous value for the key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Looks up a parameter as a string.
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

fn link_path(url: &Url) -> Option<String> {
    let path = url.path();
    if matches!(url.scheme(), "http" | "https") {
        return (!path.is_empty()).then(|| path.to_string());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(format!("/{host}{path}")),
        _ if path.is_empty() => None,
        _ if path.starts_with('/') => Some(path.to_string()),
        _ => Some(format!("/{path}")),
    }
}
