//! iOS adapter.

use lb_core::{BridgeError, ConversionValue, TrackingAuthorization};

use crate::adapter::{NativeBridge, Platform, native_error};
use crate::module::{NativeModule, TrackingTransparency};

/// Adapter over the iOS SDK.
///
/// The privacy surface goes through App Tracking Transparency: the IDFA is
/// only read once the user has authorized tracking.
#[derive(Debug)]
pub struct IosBridge<M> {
    module: M,
}

impl<M> IosBridge<M>
where
    M: NativeModule + TrackingTransparency,
{
    pub const fn new(module: M) -> Self {
        Self { module }
    }
}

impl<M> NativeBridge for IosBridge<M>
where
    M: NativeModule + TrackingTransparency,
{
    type Module = M;

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn module(&self) -> &M {
        &self.module
    }

    async fn request_tracking_permission(&self) -> Result<TrackingAuthorization, BridgeError> {
        let status = self
            .module
            .request_authorization()
            .await
            .map_err(native_error("requestTrackingPermission"))?;
        tracing::debug!(%status, "tracking authorization resolved");
        Ok(status)
    }

    async fn att_status(&self) -> Result<TrackingAuthorization, BridgeError> {
        self.module
            .authorization_status()
            .await
            .map_err(native_error("getATTStatus"))
    }

    async fn idfa(&self) -> Result<Option<String>, BridgeError> {
        let status = self.att_status().await?;
        if !status.is_authorized() {
            tracing::debug!(%status, "IDFA unavailable without tracking authorization");
            return Ok(None);
        }
        self.module
            .advertising_id()
            .await
            .map_err(native_error("getIDFA"))
    }

    async fn update_conversion_value(&self, value: ConversionValue) -> Result<(), BridgeError> {
        tracing::debug!(%value, "updateConversionValue");
        self.module
            .update_conversion_value(value)
            .await
            .map_err(native_error("updateConversionValue"))
    }
}
