//! Android adapter.

use lb_core::{BridgeError, ConversionValue, TrackingAuthorization};

use crate::adapter::{NativeBridge, Platform, native_error};
use crate::module::NativeModule;

/// Adapter over the Android SDK.
///
/// Android has no tracking-permission prompt and no SKAdNetwork: permission
/// queries report `Authorized` without calling native code, and conversion
/// values are accepted and ignored.
#[derive(Debug)]
pub struct AndroidBridge<M> {
    module: M,
}

impl<M: NativeModule> AndroidBridge<M> {
    pub const fn new(module: M) -> Self {
        Self { module }
    }
}

impl<M: NativeModule> NativeBridge for AndroidBridge<M> {
    type Module = M;

    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn module(&self) -> &M {
        &self.module
    }

    async fn request_tracking_permission(&self) -> Result<TrackingAuthorization, BridgeError> {
        Ok(TrackingAuthorization::Authorized)
    }

    async fn att_status(&self) -> Result<TrackingAuthorization, BridgeError> {
        Ok(TrackingAuthorization::Authorized)
    }

    /// Returns the Google advertising ID.
    async fn idfa(&self) -> Result<Option<String>, BridgeError> {
        self.module
            .advertising_id()
            .await
            .map_err(native_error("getIDFA"))
    }

    async fn update_conversion_value(&self, value: ConversionValue) -> Result<(), BridgeError> {
        tracing::debug!(%value, "SKAdNetwork is not available on Android; ignoring conversion value");
        Ok(())
    }
}
