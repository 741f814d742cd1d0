//! Native bridge adapters for linkbridge.
//!
//! The vendor SDKs are reached through [`NativeModule`] (both platforms) and
//! [`TrackingTransparency`] (iOS only). [`NativeBridge`] is the capability set
//! the facade drives; it has one implementation per platform:
//! - [`IosBridge`]: privacy calls go through App Tracking Transparency
//! - [`AndroidBridge`]: no permission prompt, no SKAdNetwork
//!
//! Native code reports deep links and lifecycle notifications through an
//! [`EventEmitter`].

mod adapter;
mod android;
mod error;
mod events;
mod ios;
pub mod memory;
mod module;

pub use adapter::{ANDROID_VIEW_ACTION, IOS_BROWSING_ACTIVITY, LinkInput, NativeBridge, Platform};
pub use android::AndroidBridge;
pub use error::{NativeError, NativeResult};
pub use events::{EventEmitter, EventReceiver, NativeEvent, event_channel};
pub use ios::IosBridge;
pub use memory::InMemoryNative;
pub use module::{NativeModule, TrackingTransparency};

/// The adapter for the platform this binary targets.
#[cfg(target_os = "ios")]
pub type PlatformBridge<M> = IosBridge<M>;

/// The adapter for the platform this binary targets.
#[cfg(target_os = "android")]
pub type PlatformBridge<M> = AndroidBridge<M>;
