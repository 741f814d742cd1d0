//! Tracking payloads forwarded to the native layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deep_link::Parameters;
use crate::error::ValidationError;
use crate::types::{CurrencyCode, EventName};

/// A custom in-app event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    pub event_name: EventName,
    #[serde(default)]
    pub parameters: Parameters,
}

impl TrackEvent {
    /// Creates an event with no parameters.
    pub fn new(event_name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            event_name: EventName::new(event_name)?,
            parameters: Parameters::new(),
        })
    }

    /// Adds a parameter, replacing any previous value for the key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A revenue event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseEvent {
    amount: f64,
    currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    sku: Option<String>,
}

impl PurchaseEvent {
    /// Creates a purchase after validating the amount and currency.
    ///
    /// Amounts must be finite and non-negative.
    pub fn new(amount: f64, currency: &str, sku: Option<String>) -> Result<Self, ValidationError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ValidationError::InvalidAmount { value: amount });
        }
        Ok(Self {
            amount,
            currency: CurrencyCode::new(currency)?,
            sku: sku.filter(|s| !s.trim().is_empty()),
        })
    }

    pub const fn amount(&self) -> f64 {
        self.amount
    }

    pub const fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }
}

/// A non-empty group of events forwarded as one native call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventBatch(Vec<TrackEvent>);

impl EventBatch {
    pub fn new(events: Vec<TrackEvent>) -> Result<Self, ValidationError> {
        if events.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        Ok(Self(events))
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<TrackEvent>> for EventBatch {
    type Error = ValidationError;

    fn try_from(events: Vec<TrackEvent>) -> Result<Self, Self::Error> {
        Self::new(events)
    }
}
