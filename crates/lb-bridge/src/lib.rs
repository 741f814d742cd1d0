//! linkbridge: deep linking and attribution for cross-platform apps.
//!
//! [`LinkBridge`] wraps a platform adapter ([`IosBridge`] or
//! [`AndroidBridge`]) around a native module and exposes configuration,
//! event tracking, identity, privacy controls and deep-link listeners.
//!
//! ```ignore
//! let bridge = Arc::new(LinkBridge::new(IosBridge::new(InMemoryNative::new())));
//! bridge.configure("K1", Environment::Production, ConfigureOptions::default()).await?;
//! let _sub = bridge.add_deep_link_listener(|link| {
//!     println!("{:?}", link.path);
//!     Ok(())
//! });
//! let pump = tokio::spawn({
//!     let bridge = Arc::clone(&bridge);
//!     async move { bridge.run_event_loop().await }
//! });
//! // ...
//! bridge.shutdown();
//! pump.await?;
//! ```

mod facade;
mod holder;
pub mod logging;
mod settings;

pub use facade::{EventOutcome, Lifecycle, LinkBridge};
pub use settings::{Settings, dirs_config_path};

pub use lb_core::{
    BridgeError, Configuration, ConfigureOptions, ConversionValue, DeepLinkData, DispatchReport,
    Environment, ErrorKind, ListenerError, ListenerId, ListenerResult, Parameters, Subscription,
    TrackEvent, TrackingAuthorization,
};
pub use lb_native::{
    AndroidBridge, InMemoryNative, IosBridge, LinkInput, NativeBridge, NativeModule, Platform,
    TrackingTransparency,
};
