use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::handle::GpuHandle;
use crate::platform::GpuPlatform;

use super::Inner;

/// One consumer's share of the device.
///
/// Dropping the lease releases the share. A lease that outlives a teardown
/// (device loss, `destroy`) releases nothing, so it can never decrement the
/// count of a newer device.
pub struct GpuLease<P: GpuPlatform> {
    handle: Arc<GpuHandle<P::Device>>,
    manager: Weak<Inner<P>>,
}

impl<P: GpuPlatform> GpuLease<P> {
    pub(super) fn new(manager: Weak<Inner<P>>, handle: Arc<GpuHandle<P::Device>>) -> Self {
        Self { handle, manager }
    }

    pub fn handle(&self) -> &Arc<GpuHandle<P::Device>> {
        &self.handle
    }

    /// True when both leases point at the identical device instance.
    pub fn shares_device_with(&self, other: &GpuLease<P>) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl<P: GpuPlatform> Deref for GpuLease<P> {
    type Target = GpuHandle<P::Device>;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<P: GpuPlatform> Drop for GpuLease<P> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.release_share(&self.handle);
        }
    }
}

impl<P: GpuPlatform> fmt::Debug for GpuLease<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuLease")
            .field("handle", &self.handle.id())
            .field("lost", &self.handle.is_lost())
            .finish()
    }
}
