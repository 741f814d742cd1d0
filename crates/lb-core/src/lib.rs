//! Core domain logic for linkbridge.
//!
//! This crate contains the platform-independent pieces of the bridge:
//! - Validated value types (SDK key, environment, conversion value, ...)
//! - Deep-link payloads and the listener registry that fans them out
//! - Tracking payloads forwarded to the native SDKs
//! - The error taxonomy surfaced to application code

pub mod config;
pub mod deep_link;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod types;

pub use config::{Configuration, ConfigureOptions};
pub use deep_link::{DeepLinkData, Parameters};
pub use dispatcher::{
    DeepLinkDispatcher, DispatchReport, ListenerError, ListenerId, ListenerResult, Subscription,
};
pub use error::{BoxError, BridgeError, ErrorKind, ValidationError};
pub use event::{EventBatch, PurchaseEvent, TrackEvent};
pub use types::{
    ConversionValue, CurrencyCode, Environment, EventName, SdkKey, TrackingAuthorization, UserId,
};
