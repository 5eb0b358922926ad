use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::PlatformError;
use crate::handle::HandleId;
use crate::support::Support;

/// Boundary between the lifecycle manager and the graphics API.
///
/// Implementations own whatever instance-level state the API needs and hand
/// out devices on request. The manager guarantees that `create_device` is
/// never called while another creation it started is still pending, and that
/// `release_device` is called at most once per created device.
pub trait GpuPlatform: Send + Sync + 'static {
    type Device: Send + Sync + 'static;

    /// Capability check. Must be cheap; it runs on every acquisition.
    fn support(&self) -> Support;

    fn create_device(&self) -> BoxFuture<'static, Result<Self::Device, PlatformError>>;

    /// Registers the one-shot loss notification for `device`.
    ///
    /// The platform may call [`LossSignal::notify`] from any thread, at any
    /// time, including during `release_device`.
    fn watch_device_lost(&self, device: &Self::Device, signal: LossSignal);

    fn release_device(&self, device: &Self::Device) -> Result<(), PlatformError>;
}

/// Notifier handed to the platform when a device is stored.
///
/// Notification only flips the handle's liveness flag. Cleanup happens on
/// the next acquisition or an explicit destroy.
#[derive(Clone, Debug)]
pub struct LossSignal {
    handle: HandleId,
    lost: Arc<AtomicBool>,
}

impl LossSignal {
    pub(crate) fn new(handle: HandleId, lost: Arc<AtomicBool>) -> Self {
        Self { handle, lost }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn notify(&self, message: &str) {
        if !self.lost.swap(true, Ordering::AcqRel) {
            tracing::warn!(handle = %self.handle, message, "GPU device lost");
        }
    }

    pub fn is_raised(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }
}
